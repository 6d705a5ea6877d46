use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use pck_dump_core::{ExtractEvent, PckDumper};
use tracing::warn;

use crate::{ExtractCommand, load_catalog, open_container};

fn output_path<P: AsRef<Path>>(output: &Option<PathBuf>, pack: P) -> PathBuf {
    if let Some(output) = output {
        // specified output directory
        output.clone()
    } else if let Some(parent) = pack.as_ref().parent() {
        // next to the pack file
        let dir_name = pack
            .as_ref()
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or("output".to_string());
        parent.join(dir_name)
    } else {
        // current directory
        ".".into()
    }
}

pub fn extract(cmd: &ExtractCommand) -> anyhow::Result<()> {
    let catalog = load_catalog(&cmd.pack.manifest)?;
    let source = open_container(&cmd.pack, &catalog)?;
    let output_path = output_path(&cmd.output, catalog.pack_path());
    for path in &cmd.files {
        if catalog.entry(path).is_none() {
            warn!("`{}` is not in the pack", path);
        }
    }
    let dumper = PckDumper::with_pack(catalog, source);

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::default_bar().template("{pos}/{len} files written {wide_bar} elapsed: {elapsed} eta: {eta}")?,
    );
    bar.enable_steady_tick(Duration::from_millis(100));
    bar.println(format!("Output directory: `{}`", output_path.display()));

    let bar1 = bar.clone();
    let report = dumper
        .extractor(&output_path)?
        .files(cmd.files.iter().cloned())
        .overwrite(!cmd.no_overwrite)
        .on_event(move |event| match event {
            ExtractEvent::Start { total } => bar1.set_length(total as u64),
            ExtractEvent::FileDone { .. } => bar1.inc(1),
            _ => {}
        })
        .run()?;
    bar.finish();

    if report.is_success() {
        println!("Done. {} files extracted.", report.extracted);
    } else {
        println!("{}", report.summary());
        println!(
            "Done with {} errors, {} files extracted.",
            report.failed(),
            report.extracted
        );
    }

    Ok(())
}
