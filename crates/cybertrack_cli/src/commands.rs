//! Command handlers.
//!
//! # Responsibility
//! - Build the store/service stack from the parsed config.
//! - Map each subcommand onto one core use-case and print its result.

use crate::output::{print_marker, print_markers};
use crate::{Cli, Commands};
use anyhow::{anyhow, bail, Context, Result};
use cybertrack_core::db::open_db;
use cybertrack_core::{
    default_log_level, init_logging, CreationSource, ExportFormat, GeoPoint, KvRepository,
    MarkerFilter, MarkerPatch, MarkerStore, NewMarker, NominatimClient, PlaceSearch,
    RegionResolver, ReplayGeolocation, SqliteKvRepository, TargetService, TrackingSession,
    UnknownRegionResolver,
};
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

type Service<'a, R> = TargetService<R, &'a dyn RegionResolver>;

pub fn run(cli: Cli) -> Result<()> {
    if let Some(log_dir) = &cli.log_dir {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, &log_dir.to_string_lossy()).map_err(|err| anyhow!(err))?;
    }

    let conn = open_db(&cli.db)
        .with_context(|| format!("failed to open database `{}`", cli.db.display()))?;
    let repo = SqliteKvRepository::try_new(&conn).context("database is not initialized")?;
    let store = MarkerStore::load(repo);
    if let Some(err) = store.last_persist_error() {
        eprintln!("warning: stored targets could not be read: {err}");
    }

    let nominatim = if cli.offline {
        None
    } else {
        Some(NominatimClient::new(cli.nominatim_url.as_str()).context("failed to build HTTP client")?)
    };
    let offline = UnknownRegionResolver;
    let resolver: &dyn RegionResolver = match &nominatim {
        Some(client) => client,
        None => &offline,
    };
    let mut service: Service<'_, _> = TargetService::new(store, resolver);

    let result = dispatch(&mut service, nominatim.as_ref(), cli.command);
    if let Some(err) = service.store().last_persist_error() {
        eprintln!("warning: changes were not saved: {err}");
    }
    result
}

fn dispatch<R: KvRepository>(
    service: &mut Service<'_, R>,
    search: Option<&NominatimClient>,
    command: Commands,
) -> Result<()> {
    match command {
        Commands::List { rank, region } => {
            let filter = MarkerFilter { rank, region };
            print_markers(service.filtered(&filter));
            Ok(())
        }
        Commands::Add {
            lat,
            lng,
            name,
            note,
            rank,
            region,
        } => {
            let mut draft = NewMarker::at(GeoPoint::new(lat, lng), CreationSource::MapClick);
            if name.is_some() {
                draft.name = name;
            }
            draft.note = note;
            draft.rank = rank.unwrap_or_default();
            draft.region = region;
            let marker = service.add_draft(draft).context("failed to add target")?;
            print_marker(&marker);
            Ok(())
        }
        Commands::Edit {
            id,
            name,
            note,
            rank,
            region,
        } => {
            let patch = MarkerPatch {
                name,
                note,
                rank,
                region,
            };
            if patch.is_empty() {
                bail!("nothing to change; pass --name, --note, --rank or --region");
            }
            let marker = service
                .edit(&id, &patch)
                .with_context(|| format!("failed to edit target `{id}`"))?;
            print_marker(&marker);
            Ok(())
        }
        Commands::Remove { id } => {
            if !service.remove(&id) {
                bail!("no target with id `{id}`");
            }
            println!("removed {id}");
            Ok(())
        }
        Commands::Export { format, out } => export(service, format.into(), out),
        Commands::Import { file } => import(service, &file),
        Commands::Regions => {
            for region in service.regions() {
                println!("{region}");
            }
            Ok(())
        }
        Commands::Search { query, add } => {
            let client = search.context("search needs network access; drop --offline")?;
            let Some(hit) = client
                .search(&query)
                .with_context(|| format!("place search for `{query}` failed"))?
            else {
                println!("no place found for `{query}`");
                return Ok(());
            };
            println!(
                "{} ({:.6}, {:.6})",
                hit.display_name, hit.point.lat, hit.point.lng
            );
            if add {
                let marker = service.add_search_hit(&hit).context("failed to add target")?;
                print_marker(&marker);
            }
            Ok(())
        }
        Commands::Track { replay, mark } => track(service, &replay, mark),
    }
}

fn export<R: KvRepository>(
    service: &Service<'_, R>,
    format: ExportFormat,
    out: Option<PathBuf>,
) -> Result<()> {
    let payload = service.export(format).context("export failed")?;
    let path = export_path(out, &payload.file_name);
    fs::write(&path, &payload.bytes)
        .with_context(|| format!("failed to write `{}`", path.display()))?;
    println!(
        "exported {} targets to {}",
        service.markers().len(),
        path.display()
    );
    Ok(())
}

fn export_path(out: Option<PathBuf>, file_name: &str) -> PathBuf {
    match out {
        Some(path) if path.is_dir() => path.join(file_name),
        Some(path) => path,
        None => PathBuf::from(file_name),
    }
}

fn import<R: KvRepository>(service: &mut Service<'_, R>, file: &Path) -> Result<()> {
    let content = fs::read_to_string(file)
        .with_context(|| format!("failed to read `{}`", file.display()))?;
    let file_name = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let report = service
        .import(&file_name, &content)
        .with_context(|| format!("failed to import `{}`", file.display()))?;
    println!(
        "imported {} of {} entries ({} malformed, {} out of range, {} duplicate)",
        report.accepted,
        report.decoded,
        report.skipped_decode,
        report.skipped_invalid,
        report.skipped_duplicate
    );
    Ok(())
}

fn track<R: KvRepository>(service: &mut Service<'_, R>, replay: &Path, mark: bool) -> Result<()> {
    let text = fs::read_to_string(replay)
        .with_context(|| format!("failed to read track `{}`", replay.display()))?;
    let provider = ReplayGeolocation::from_track_text(&text);
    let mut session = TrackingSession::new(&provider);

    session.start().context("tracking could not start")?;
    session.stop();

    let notices = session.take_notices();
    for notice in &notices {
        eprintln!("warning: {notice}");
    }
    let path = session.path();
    info!(
        "event=track_replay module=cli status=ok samples={} notices={}",
        path.len(),
        notices.len()
    );
    println!("replayed {} samples", path.len());

    let Some(last) = path.last() else {
        return Ok(());
    };
    println!("last position {last}");
    if mark {
        let marker = service
            .add_at(*last, CreationSource::CurrentPosition)
            .context("failed to mark position")?;
        print_marker(&marker);
    }
    Ok(())
}
