//! Replay a directory of camera frames through a full scanning session.
//!
//! ```text
//! cargo run --example replay_scan -- layout.json answers.json frames/ [out/] [scan.json]
//! ```

use std::path::PathBuf;

use omr::{
    AnswerKey, CancelToken, Layout, ReplayDevice, ScanConfig, ScanExit, ScanLoop, ScanReport,
    SessionController,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let [layout_path, key_path, frames_dir, rest @ ..] = args.as_slice() else {
        eprintln!("Usage: replay_scan <layout.json> <answers.json> <frames_dir> [out_dir] [config.json]");
        return Ok(());
    };
    let out_dir = rest
        .first()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("scan_out"));
    let config = match rest.get(1) {
        Some(path) => ScanConfig::load_json(path)?,
        None => ScanConfig::default(),
    };

    let layout = Layout::load_json(layout_path)?;
    let key = AnswerKey::from_json(&std::fs::read_to_string(key_path)?)?;
    let mut session = SessionController::new(layout, &key, &config)?;
    let mut camera = ReplayDevice::from_dir(frames_dir)?;
    println!("replaying {} frames", camera.len());

    let exit = ScanLoop::from_config(&config).run(
        &mut session,
        &mut camera,
        &config.capture,
        &CancelToken::new(),
    )?;
    let snapshots = match exit {
        ScanExit::Completed(snapshots) => snapshots,
        other => {
            println!("scan did not complete ({other:?})");
            return Ok(());
        }
    };

    let (raw, annotated) = snapshots.save_png(&out_dir)?;
    let results = session.confirm()?;
    let report = ScanReport::new(&session, results);
    let report_path = out_dir.join("report.json");
    report.write_json(&report_path)?;

    for (id, r) in &report.results {
        println!(
            "{id}: {:?} (detected {:?}, expected {:?}, confidence {:.2})",
            r.status, r.detected_answer, r.correct_answer, r.confidence
        );
    }
    println!(
        "wrote {}, {} and {}",
        raw.display(),
        annotated.display(),
        report_path.display()
    );
    Ok(())
}

fn init_logging() {
    #[cfg(feature = "tracing")]
    {
        let _ = omr::core::init_tracing(false, "info");
    }
    #[cfg(not(feature = "tracing"))]
    {
        let directives = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
        let _ = omr::core::init_with_filter(omr::core::LogFilter::parse(&directives));
    }
}
