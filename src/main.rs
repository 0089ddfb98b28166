use advisr::catalog::{
    check_eligibility, CatalogDb, CourseStore, EdgeKind, PrereqEdge, SqliteCourseStore,
};
use advisr::cli::{Cli, Commands, ConfigAction, CourseDumpEntry};
use advisr::config::Config;
use advisr::embedding::LazyCourseIndex;
use advisr::error::{AdvisrError, Result};
use advisr::patterns::QueryPatterns;
use advisr::retrieval::HybridRetriever;
use std::path::PathBuf;
use std::sync::Arc;

fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse_args();

    match cli.command {
        Commands::Init { force } => {
            cmd_init(cli.config, force)?;
        }
        Commands::Load { file } => {
            cmd_load(cli.config, cli.profile, &file)?;
        }
        Commands::Search { query, limit, json } => {
            cmd_search(cli.config, cli.profile, &query, limit, json)?;
        }
        Commands::Check {
            target,
            completed,
            current,
        } => {
            cmd_check(cli.config, cli.profile, &target, &completed, &current)?;
        }
        Commands::Stats => {
            cmd_stats(cli.config, cli.profile)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, cli.profile, action)?;
        }
    }

    Ok(())
}

fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("advisr=info"));

    fmt().with_env_filter(filter).with_target(false).init();
}

fn config_path(cli_path: Option<PathBuf>) -> Result<PathBuf> {
    match cli_path {
        Some(path) => Ok(path),
        None => Config::default_path(),
    }
}

fn load_config(cli_path: Option<PathBuf>, profile: Option<String>) -> Result<Config> {
    let path = config_path(cli_path)?;
    let mut config = if path.exists() {
        Config::load(&path)?
    } else {
        tracing::warn!(
            "No configuration at {:?}; using defaults (run `advisr init` to create one)",
            path
        );
        let mut config = Config::default();
        config.storage.data_dir = Config::default_data_dir()?;
        config
    };
    if let Some(profile) = profile {
        config.apply_profile(&profile);
    }
    Ok(config)
}

fn expand_path(path: &std::path::Path) -> Result<PathBuf> {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| AdvisrError::Config("Cannot determine home directory".to_string()))?;
        Ok(home.join(rest))
    } else {
        Ok(path.to_path_buf())
    }
}

fn open_store(config: &Config) -> Result<Arc<SqliteCourseStore>> {
    let data_dir = expand_path(&config.storage.data_dir)?;
    let db = CatalogDb::open(&data_dir.join("catalog.db"))?;
    Ok(Arc::new(SqliteCourseStore::new(db)))
}

fn load_patterns(config: &Config) -> Result<Arc<QueryPatterns>> {
    let patterns = match &config.patterns.overrides_file {
        Some(path) => QueryPatterns::from_file(&expand_path(path)?)?,
        None => QueryPatterns::builtin()?,
    };
    Ok(Arc::new(patterns))
}

fn build_retriever(config: &Config, patterns: Arc<QueryPatterns>) -> Result<HybridRetriever> {
    let store = open_store(config)?;
    let similarity = Arc::new(LazyCourseIndex::new(
        store.clone() as Arc<dyn CourseStore>,
        config.embedding.model.clone(),
        config.indexing.clone(),
        config.embedding.batch_size,
    ));
    Ok(HybridRetriever::new(
        store,
        similarity,
        patterns,
        config.retrieval.clone(),
    ))
}

fn cmd_init(cli_path: Option<PathBuf>, force: bool) -> Result<()> {
    let path = config_path(cli_path)?;
    if path.exists() && !force {
        return Err(AdvisrError::Config(format!(
            "Configuration already exists at {:?} (use --force to overwrite)",
            path
        )));
    }

    let mut config = Config::default();
    config.storage.data_dir = Config::default_data_dir()?;
    config.save(&path)?;

    println!("✓ Wrote configuration to {:?}", path);
    println!("  Catalog database: {:?}", config.storage.catalog_path());
    Ok(())
}

fn cmd_load(cli_path: Option<PathBuf>, profile: Option<String>, file: &PathBuf) -> Result<()> {
    let config = load_config(cli_path, profile)?;
    let store = open_store(&config)?;

    let content = std::fs::read_to_string(file).map_err(|e| AdvisrError::Io {
        source: e,
        context: format!("Failed to read course dump: {:?}", file),
    })?;
    let entries: Vec<CourseDumpEntry> =
        serde_json::from_str(&content).map_err(|e| AdvisrError::Json {
            source: e,
            context: format!("Failed to parse course dump: {:?}", file),
        })?;

    let mut course_count = 0;
    let mut edge_count = 0;
    for entry in &entries {
        store.upsert_course(&entry.course)?;
        course_count += 1;
    }
    // Second pass so edge destinations always exist
    for entry in &entries {
        for source in &entry.prereq_edges {
            store.upsert_edge(&PrereqEdge {
                source: source.clone(),
                destination: entry.course.id.clone(),
                kind: EdgeKind::Prereq,
            })?;
            edge_count += 1;
        }
        for source in &entry.coreq_edges {
            store.upsert_edge(&PrereqEdge {
                source: source.clone(),
                destination: entry.course.id.clone(),
                kind: EdgeKind::Coreq,
            })?;
            edge_count += 1;
        }
    }

    println!("✓ Loaded {} courses and {} edges", course_count, edge_count);
    Ok(())
}

fn cmd_search(
    cli_path: Option<PathBuf>,
    profile: Option<String>,
    query: &str,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let config = load_config(cli_path, profile)?;
    let max_results = limit.unwrap_or(config.retrieval.max_results);
    let patterns = load_patterns(&config)?;
    let retriever = build_retriever(&config, patterns.clone())?;

    let intent = advisr::retrieval::classify(query, &patterns);
    tracing::debug!(?intent, "query intent");

    let result = retriever.search(query, max_results)?;
    let courses = retriever.enrich(&result.course_ids())?;

    if json {
        let payload = serde_json::json!({
            "result": result,
            "courses": courses,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&payload).map_err(|e| AdvisrError::Json {
                source: e,
                context: "Failed to serialize search result".to_string(),
            })?
        );
        return Ok(());
    }

    if let Some(planning) = &result.planning {
        println!(
            "Planning query ({:?}){}:",
            planning.kind,
            planning
                .department
                .as_deref()
                .map(|d| format!(", department {}", d))
                .unwrap_or_default()
        );
    }

    if result.needs_clarification() {
        if let Some(alternatives) = result.hits.first().and_then(|h| h.alternatives.as_ref()) {
            println!("Multiple courses share that title; did you mean one of:");
            for alt in alternatives {
                println!("  - {}", alt);
            }
            println!();
        }
    }

    if result.hits.is_empty() {
        println!("No matching courses.");
        return Ok(());
    }

    let course_map: std::collections::HashMap<&str, &advisr::catalog::CourseRecord> =
        courses.iter().map(|c| (c.id.as_str(), c)).collect();

    for hit in &result.hits {
        let Some(course) = course_map.get(hit.course_id.as_str()) else {
            println!("{}  [score {:.3}]", hit.course_id, hit.score);
            continue;
        };

        let offered: Vec<&str> = [
            course.offered_fall.then_some("Fall"),
            course.offered_winter.then_some("Winter"),
            course.offered_summer.then_some("Summer"),
        ]
        .into_iter()
        .flatten()
        .collect();

        println!("{}  [score {:.3}]", course.label(), hit.score);
        if !course.prereq_text.is_empty() {
            println!("  Prereqs: {}", course.prereq_text);
        }
        if !course.coreq_text.is_empty() {
            println!("  Coreqs: {}", course.coreq_text);
        }
        if !offered.is_empty() {
            println!("  Offered: {}", offered.join(", "));
        }
    }

    Ok(())
}

fn cmd_check(
    cli_path: Option<PathBuf>,
    profile: Option<String>,
    target: &str,
    completed: &[String],
    current: &[String],
) -> Result<()> {
    let config = load_config(cli_path, profile)?;
    let store = open_store(&config)?;

    let target = target.trim().to_uppercase();
    let report = check_eligibility(store.as_ref(), completed, current, &target)?;

    if report.total_prereqs == 0 && report.total_coreqs == 0 {
        println!(
            "{} has no prerequisite edges in the catalog; check its calendar entry.",
            target
        );
        return Ok(());
    }

    if report.eligible {
        println!("✓ Eligible for {}", target);
    } else {
        println!("✗ Not yet eligible for {}", target);
        if !report.missing_prereqs.is_empty() {
            println!("  Missing prerequisites: {}", report.missing_prereqs.join(", "));
        }
        if !report.missing_coreqs.is_empty() {
            println!("  Missing corequisites: {}", report.missing_coreqs.join(", "));
        }
    }

    Ok(())
}

fn cmd_stats(cli_path: Option<PathBuf>, profile: Option<String>) -> Result<()> {
    let config = load_config(cli_path, profile)?;
    let store = open_store(&config)?;

    let stats = store.db().stats()?;
    println!("Courses:      {}", stats.course_count);
    println!("Edges:        {}", stats.edge_count);
    println!("Placeholders: {}", stats.placeholder_count);

    Ok(())
}

fn cmd_config(
    cli_path: Option<PathBuf>,
    profile: Option<String>,
    action: ConfigAction,
) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(cli_path, profile)?;
            println!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::Path => {
            println!("{}", config_path(cli_path)?.display());
        }
    }
    Ok(())
}
