use std::{path::PathBuf, time::Instant};

use drawpool::{ConfigPoolLoader, PoolLoader, PoolManager};
use drawpool_config::{DrawConfiguration, LoadTomlConfiguration, LoggingConfig};
use rayon::prelude::*;

fn init_logger(config: &LoggingConfig) {
    if config.enabled {
        let mut logger = simple_logger::SimpleLogger::new();
        logger = logger.with_timestamp_format(time::macros::format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second]"
        ));

        if !config.timestamp {
            logger = logger.without_timestamps();
        }

        if config.env {
            logger = logger.env();
        }

        logger = logger.with_level(config.level.into());

        logger = logger.with_colors(config.color);
        logger = logger.with_threads(config.threads);
        logger.init().unwrap();
    }
}

fn main() {
    let path = std::env::args_os()
        .nth(1)
        .map_or_else(|| DrawConfiguration::default_path().to_path_buf(), PathBuf::from);
    let config = DrawConfiguration::load(&path)
        .unwrap_or_else(|err| panic!("Failed to load configuration {path:?}: {err}"));
    init_logger(&config.logging);

    log::info!(
        "Starting drawpool {} with {} pools",
        env!("CARGO_PKG_VERSION"),
        config.pools.len()
    );

    let manager = PoolManager::new();
    ConfigPoolLoader::new(&config)
        .load_pools(&manager)
        .expect("Failed to load pools");

    let demo = &config.demo;
    let Some(drawer) = manager.get_drawer(&demo.pool) else {
        log::error!("Pool '{}' is not configured, nothing to draw", demo.pool);
        return;
    };

    match drawer.pool().probability_summary() {
        Ok(summary) => println!("{summary}\n"),
        Err(err) => {
            err.log();
            return;
        }
    }

    let total = demo.threads * demo.draws_per_thread;
    log::info!(
        "Drawing {} times from '{}' on {} threads",
        total,
        demo.pool,
        demo.threads
    );

    let workers = rayon::ThreadPoolBuilder::new()
        .num_threads(demo.threads)
        .build()
        .expect("Failed to start draw threads");

    let time = Instant::now();
    let failed = workers.install(|| {
        (0..total)
            .into_par_iter()
            .filter(|_| drawer.draw().is_err())
            .count()
    });
    let elapsed = time.elapsed();

    println!("{}", drawer.report());
    if failed > 0 {
        log::warn!("{failed} draws failed");
    }
    log::info!(
        "Drew {} items in {}ms ({:.0} draws/s)",
        total,
        elapsed.as_millis(),
        total as f64 / elapsed.as_secs_f64()
    );
}
