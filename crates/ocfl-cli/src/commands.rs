use std::io::{self, Read, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::Utc;
use colored::Colorize;
use tracing::debug;

use ocfl_session::{
    DefaultSessionFactory, OcflObjectSession, OcflObjectSessionFactory, SessionConfig,
    SessionError, SessionResult,
};
use ocfl_store::FsStoreEngine;
use ocfl_types::{InteractionModel, OcflObjectId, ResourceContent, ResourceHeaders, ResourceId};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let factory = open_factory(&cli)?;
    match cli.command {
        Command::Write(args) => cmd_write(&factory, args),
        Command::Delete(args) => cmd_delete(&factory, args),
        Command::Purge(args) => cmd_purge(&factory, args),
        Command::Cat(args) => cmd_cat(&factory, args),
        Command::Headers(args) => cmd_headers(&factory, args, &cli.format),
        Command::Log(args) => cmd_log(&factory, args, &cli.format),
    }
}

fn open_factory(cli: &Cli) -> anyhow::Result<DefaultSessionFactory> {
    let config = match &cli.config {
        Some(path) => {
            let config = SessionConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?;
            debug!(path = %path.display(), ?config, "session config loaded");
            config
        }
        None => SessionConfig::default(),
    };
    let engine = FsStoreEngine::open(&cli.root)
        .with_context(|| format!("opening store at {}", cli.root.display()))?;
    Ok(DefaultSessionFactory::new(Arc::new(engine), config))
}

fn cmd_write(factory: &DefaultSessionFactory, args: WriteArgs) -> anyhow::Result<()> {
    let object = OcflObjectId::new(args.object)?;
    let resource = ResourceId::new(args.resource)?;
    let bytes = read_input(&args.file)?;
    let model = InteractionModel::from(args.model);

    let session = factory.new_session(&object)?;
    let mut headers = ResourceHeaders::new(resource.clone(), model);
    if let Some(mime_type) = args.mime_type {
        headers = headers.with_mime_type(mime_type);
    }
    match session.read_resource_headers(&resource) {
        Ok(existing) => headers.created = existing.created,
        Err(SessionError::NotFound(_)) => {}
        Err(err) => return Err(err.into()),
    }

    let size = bytes.len();
    let content = ResourceContent::new(headers, bytes);
    match model {
        InteractionModel::Rdf => session.write_rdf_resource(content)?,
        InteractionModel::NonRdf => session.write_non_rdf_resource(content)?,
        InteractionModel::AclRdf => session.write_acl_rdf_resource(content)?,
        InteractionModel::AclNonRdf => session.write_acl_non_rdf_resource(content)?,
    }
    println!("  {} {} ({model}, {size} bytes)", "staged:".green(), resource);
    commit(&session, args.version)
}

fn cmd_delete(factory: &DefaultSessionFactory, args: DeleteArgs) -> anyhow::Result<()> {
    let object = OcflObjectId::new(args.object)?;
    let resource = ResourceId::new(args.resource)?;
    let session = factory.new_session(&object)?;

    let headers = session.read_resource_headers(&resource)?;
    if headers.deleted {
        bail!("{resource} has no content to delete");
    }
    session.delete_content_file(headers.into_deleted(Utc::now()))?;
    println!("  {} {}", "deleted:".red(), resource);
    commit(&session, args.version)
}

fn cmd_purge(factory: &DefaultSessionFactory, args: DeleteArgs) -> anyhow::Result<()> {
    let object = OcflObjectId::new(args.object)?;
    let resource = ResourceId::new(args.resource)?;
    let session = factory.new_session(&object)?;

    let headers = session.read_resource_headers(&resource)?;
    if !headers.deleted && headers.content_path.is_some() {
        session.delete_content_file(headers.into_deleted(Utc::now()))?;
    }
    session.delete_header_file(&resource)?;
    println!("  {} {}", "purged:".red().bold(), resource);
    commit(&session, args.version)
}

fn cmd_cat(factory: &DefaultSessionFactory, args: ReadArgs) -> anyhow::Result<()> {
    let object = OcflObjectId::new(args.object)?;
    let resource = ResourceId::new(args.resource)?;
    let content = read_only(factory, &object, |session| match args.at {
        Some(version) => session.read_content_at(&resource, version),
        None => session.read_content(&resource),
    })?;
    let Some(bytes) = content.bytes() else {
        bail!("{resource} has no content file");
    };
    let mut out = io::stdout().lock();
    out.write_all(bytes)?;
    out.flush()?;
    Ok(())
}

fn cmd_headers(
    factory: &DefaultSessionFactory,
    args: ReadArgs,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let object = OcflObjectId::new(args.object)?;
    let resource = ResourceId::new(args.resource)?;
    let headers = read_only(factory, &object, |session| match args.at {
        Some(version) => session.read_headers_at(&resource, version),
        None => session.read_resource_headers(&resource),
    })?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&headers)?),
        OutputFormat::Text => {
            println!("{}", headers.id.to_string().bold());
            println!("  Model:    {}", headers.interaction_model.to_string().cyan());
            if let Some(mime_type) = &headers.mime_type {
                println!("  Type:     {mime_type}");
            }
            if let Some(digest) = &headers.content_digest {
                println!("  Digest:   {}", digest.to_hex().dimmed());
            }
            if let Some(size) = headers.content_size {
                println!("  Size:     {size}");
            }
            if let Some(path) = &headers.content_path {
                println!("  Path:     {path}");
            }
            println!("  Created:  {}", headers.created.to_rfc3339());
            println!("  Modified: {}", headers.last_modified.to_rfc3339());
            if headers.deleted {
                println!("  {}", "deleted".red());
            }
        }
    }
    Ok(())
}

fn cmd_log(
    factory: &DefaultSessionFactory,
    args: LogArgs,
    format: &OutputFormat,
) -> anyhow::Result<()> {
    let object = OcflObjectId::new(args.object)?;
    let versions = read_only(factory, &object, |session| session.list_versions())?;
    let newest: Vec<_> = versions.iter().rev().take(args.limit).collect();

    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(&newest)?);
        return Ok(());
    }
    if newest.is_empty() {
        println!("No versions of {}.", object.to_string().bold());
        return Ok(());
    }
    for details in newest {
        let message = details.info.message.as_deref().unwrap_or("");
        if args.oneline {
            println!(
                "{} {} {}",
                details.number.to_string().yellow(),
                details.info.created.format("%Y-%m-%d").to_string().dimmed(),
                message
            );
        } else {
            println!(
                "{}  {}",
                details.number.to_string().yellow().bold(),
                details.info.created.to_rfc3339().dimmed()
            );
            if let Some(author) = &details.info.author {
                println!("  Author: {author}");
            }
            println!("  Resources: {}", details.resource_count);
            if !message.is_empty() {
                println!("  {message}");
            }
        }
    }
    Ok(())
}

/// Apply version metadata and commit.
fn commit(session: &OcflObjectSession, version: VersionArgs) -> anyhow::Result<()> {
    if let Some(message) = version.message {
        session.version_message(message)?;
    }
    if let Some(author) = version.author {
        session.version_author(author, version.address)?;
    }
    match session.commit()? {
        Some(number) => println!(
            "{} Committed {} {}",
            "✓".green().bold(),
            session.ocfl_object_id().to_string().bold(),
            number.to_string().yellow()
        ),
        None => println!("Nothing to commit."),
    }
    Ok(())
}

/// Run `read` in a throwaway session.
fn read_only<T>(
    factory: &DefaultSessionFactory,
    object: &OcflObjectId,
    read: impl FnOnce(&OcflObjectSession) -> SessionResult<T>,
) -> anyhow::Result<T> {
    let session = factory.new_session(object)?;
    let result = read(session.as_ref());
    if session.is_open() {
        session.abort()?;
    }
    Ok(result?)
}

fn read_input(path: &Path) -> anyhow::Result<Vec<u8>> {
    if path == Path::new("-") {
        let mut buf = Vec::new();
        io::stdin().lock().read_to_end(&mut buf)?;
        return Ok(buf);
    }
    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
}
