//! Extract command implementation.

use crate::cli::ExtractArgs;
use crate::error::add_archive_context;
use crate::output::OutputFormatter;
use crate::progress::CliProgress;
use anyhow::Context;
use anyhow::Result;
use firmex_core::ArchiveSource;
use firmex_core::Dispatcher;
use firmex_core::ExtractionRequest;
use firmex_core::NoopProgress;
use firmex_core::ProgressCallback;
use firmex_core::Selectors;
use firmex_core::TransportConfig;
use std::env;
use std::path::PathBuf;
use tracing::debug;
use tracing::info;

fn build_request(args: &ExtractArgs) -> Result<ExtractionRequest> {
    let output_dir = match &args.output {
        Some(dir) => dir.clone(),
        None => env::current_dir().context("failed to get current directory")?,
    };

    let source = if args.remote {
        let transport = TransportConfig {
            proxy: args.proxy.clone(),
            insecure: args.insecure,
        };
        add_archive_context(ArchiveSource::remote(&args.archive, transport), &args.archive)?
    } else {
        ArchiveSource::local(PathBuf::from(&args.archive))
    };

    let selectors = Selectors {
        kernel: args.kernel,
        dyld: args.dyld,
        device_tree: args.dtree,
        filesystem_image: args.dmg,
        iboot: args.iboot,
        sep: args.sep,
        pattern: args.pattern.clone(),
        dyld_arches: Vec::new(),
    };

    let request = ExtractionRequest::builder(source)
        .selectors(selectors)
        .dyld_arches(args.dyld_arch.iter().cloned())
        .output(output_dir)
        .build();
    add_archive_context(request, &args.archive)
}

pub fn execute(
    args: &ExtractArgs,
    formatter: &dyn OutputFormatter,
    show_progress: bool,
) -> Result<()> {
    let request = build_request(args)?;
    debug!(
        archive = %args.archive,
        mode = ?request.mode(),
        kinds = ?request.active_kinds(),
        output = %request.output_root().display(),
        "built extraction request"
    );
    let dispatcher = add_archive_context(Dispatcher::new(), &args.archive)?;

    let mut progress: Box<dyn ProgressCallback> = if show_progress && CliProgress::should_show() {
        Box::new(CliProgress::new())
    } else {
        Box::new(NoopProgress)
    };

    let report = add_archive_context(dispatcher.run(&request, progress.as_mut()), &args.archive)?;

    info!(
        files = report.files_extracted(),
        bytes = report.bytes_written(),
        destination = %report.destination.display(),
        "extraction finished"
    );
    formatter.render_report(&report)?;

    Ok(())
}
