use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use layerscope_hook::HookConfig;

pub fn run(mode: &str, port: u16, moonraker_url: &str, settle_secs: u64, samples: usize) {
    let config = HookConfig {
        listen_port: port,
        moonraker_url: moonraker_url.to_string(),
        settle: Duration::from_secs(settle_secs),
        samples,
        ..HookConfig::default()
    };

    println!("layerscope hook v{}", layerscope_core::VERSION);
    println!("   mode: {mode}");
    match mode {
        "webhook" => {
            println!("   listening on 0.0.0.0:{port}");
            println!("   Health check:   http://localhost:{port}/health");
            println!("   Manual trigger: http://localhost:{port}/analyze");
        }
        _ => println!("   polling {moonraker_url} for print state changes"),
    }
    println!();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(err) => {
            eprintln!("Failed to start async runtime: {err}");
            std::process::exit(1);
        }
    };

    match mode {
        "webhook" => {
            if let Err(err) = rt.block_on(layerscope_hook::run_webhook(config)) {
                eprintln!("Webhook listener failed: {err}");
                std::process::exit(1);
            }
        }
        _ => {
            let running = Arc::new(AtomicBool::new(true));
            let flag = running.clone();
            if let Err(err) = ctrlc::set_handler(move || flag.store(false, Ordering::SeqCst)) {
                log::warn!("ctrl-c handler unavailable: {err}");
            }
            rt.block_on(layerscope_hook::run_poll(config, running));
        }
    }
}
