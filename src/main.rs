use anyhow::{Context, Result};
use exprtask::cli::{parse_args, setup_logging, BuildArgs, Commands, RankArgs, SplitArgs};
use exprtask::config::AdapterConfig;
use exprtask::data::loader::{load_annotation, DataLoader, LoaderConfig};
use exprtask::data::UnmappedPolicy;
use exprtask::export;
use exprtask::pipeline::Pipeline;
use exprtask::selection::{rank_container, VarianceEstimator};
use exprtask::task::{Task, TaskId, TaskKind};
use exprtask::utils::{ensure_parent_dir, format_number};
use tracing::{error, info};

fn main() {
    let cli = parse_args();

    setup_logging(cli.verbose);

    info!("{}", exprtask::info());

    let result = match cli.command {
        Commands::Build(args) => run_build(args),
        Commands::Rank(args) => run_rank(args),
        Commands::Split(args) => run_split(args),
    };

    if let Err(e) = result {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn estimator(sample_variance: bool) -> VarianceEstimator {
    if sample_variance {
        VarianceEstimator::Sample
    } else {
        VarianceEstimator::Population
    }
}

fn run_build(args: BuildArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => AdapterConfig::from_json_file(path)?,
        None => AdapterConfig::default(),
    };

    // Command-line flags override the config file
    if let Some(k) = args.top_k {
        config.top_k = Some(k);
    }
    if let Some(column) = args.label_column {
        config.label_column = column;
    }
    if let Some(column) = args.sample_column {
        config.sample_column = column;
    }
    if !args.classes.is_empty() {
        config.classes = args.classes;
    }
    if args.drop_unmapped {
        config.unmapped = UnmappedPolicy::Drop;
    }
    if args.sample_variance {
        config.estimator = VarianceEstimator::Sample;
    }
    if let Some(id) = args.task_id {
        config.task_id = id;
    }
    if args.clustering {
        config.task_kind = TaskKind::Clustering;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    info!("Input matrix: {:?}", args.input);
    info!("Sample sheet: {:?}", args.samples);

    let loader = DataLoader::with_config(LoaderConfig {
        sample_column: config.sample_column.clone(),
        label_column: config.label_column.clone(),
        ..LoaderConfig::default()
    });
    let mut container = loader.load(&args.input, &args.samples)?;

    if let Some(path) = &args.annotation {
        let mapping = load_annotation(path)?;
        container = container
            .rename_features(&mapping, config.unmapped)
            .context("Failed to apply annotation")?;
    }

    let pipeline = Pipeline::new(config);
    let output = pipeline
        .run(&container)
        .context("Failed to build feature table")?;

    ensure_parent_dir(&args.output)?;
    export::save_table(output.task.table(), &args.output)?;

    if let Some(path) = &args.ranking {
        ensure_parent_dir(path)?;
        export::save_ranking(&output.ranking, path)?;
    }
    if let Some(path) = &args.summary {
        ensure_parent_dir(path)?;
        export::save_json(&output.summary(), path)?;
    }
    if let Some(path) = &args.splits {
        let instance = pipeline
            .resample(&output.task)
            .context("Failed to instantiate resampling")?;
        ensure_parent_dir(path)?;
        export::save_json(&instance, path)?;
    }

    info!("\n=== Build Summary ===");
    info!("Samples: {}", format_number(output.task.n_rows()));
    info!("Dropped (missing label): {}", output.dropped_samples.len());
    info!(
        "Features: {} of {}",
        format_number(output.selection.len()),
        format_number(output.full_table.n_features())
    );
    for (class, count) in output.task.class_counts() {
        info!("  {}: {}", class, count);
    }

    Ok(())
}

fn run_rank(args: RankArgs) -> Result<()> {
    let container = DataLoader::new().load_matrix(&args.input)?;
    let ranking = rank_container(&container, estimator(args.sample_variance));

    ensure_parent_dir(&args.output)?;
    export::save_ranking(&ranking, &args.output)?;

    info!(
        "{} of {} features vary across samples",
        format_number(ranking.n_variable()),
        format_number(ranking.len())
    );
    Ok(())
}

fn run_split(args: SplitArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => AdapterConfig::from_json_file(path)?,
        None => AdapterConfig::default(),
    };
    args.apply_to(&mut config);

    let loader = DataLoader::with_config(LoaderConfig {
        label_column: config.label_column.clone(),
        ..LoaderConfig::default()
    });
    let table = loader.load_feature_table(&args.input)?;

    let task = Task::classification(
        TaskId::new(config.task_id.clone())?,
        table,
        &config.label_column,
    )?;
    let instance = Pipeline::new(config)
        .resample(&task)
        .context("Failed to instantiate resampling")?;

    ensure_parent_dir(&args.output)?;
    export::save_json(&instance, &args.output)?;

    if let Some(dir) = &args.tables_dir {
        let written = export::save_split_tables(&instance, task.table(), dir, &args.tables_format)?;
        info!("Wrote {} split tables to {:?}", written.len(), dir);
    }

    info!(
        "Wrote {} split(s) over {} rows to {:?}",
        instance.iters(),
        task.n_rows(),
        args.output
    );
    Ok(())
}
