//! Command implementations

use std::path::{Path, PathBuf};

use tracing::{debug, info};
use towcheck_app::app::review_service;
use towcheck_app::app::weigh_service::{run_weigh_check, save_result, WeighRequest};
use towcheck_app::config::Config;
use towcheck_app::repository;
use towcheck_domain::model::{
    CapacitySet, CaravanCapacities, SpecKey, SpecLookup, VehicleCapacities,
};
use towcheck_domain::repository::{SpecRegistry, WeighResultRepository};
use towcheck_domain::service::{DeltaCalculator, SpecResolver};
use towcheck_infra::readings_csv::ReadingsImport;
use towcheck_types::{ComplianceError, ConfigError, OutputFormat, Result, StoreError};

use crate::cli::{Cli, Commands, KindArg, PendingAction, RegistryAction, ReviewAction};
use crate::output::{self, LookupReport};
use crate::telemetry;

/// Registry lookup arguments of the `resolve` command
struct ResolveArgs {
    plate: Option<String>,
    state: Option<String>,
    make: Option<String>,
    model: Option<String>,
    year: Option<u16>,
    variant: Option<String>,
}

pub fn execute(cli: Cli) -> Result<()> {
    let config_path = Config::config_path()?;
    let mut config = startup_config(&cli.command, &config_path)?;
    if let Some(dir) = cli.store_dir {
        config.store_dir = Some(dir);
    }
    let output_format = cli.format.unwrap_or(config.output_format);

    telemetry::init(&config.log_level, cli.verbose)
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;
    debug!(store = ?config.store_dir, format = %output_format, "configuration loaded");

    match cli.command {
        Commands::Check {
            request,
            readings,
            save,
        } => cmd_check(&config, output_format, &request, readings.as_deref(), save),

        Commands::Resolve {
            kind,
            plate,
            state,
            make,
            model,
            year,
            variant,
        } => cmd_resolve(
            &config,
            output_format,
            kind,
            ResolveArgs {
                plate,
                state,
                make,
                model,
                year,
                variant,
            },
        ),

        Commands::Registry { action } => match action {
            RegistryAction::Import { seed } => cmd_registry_import(&config, &seed),
            RegistryAction::List => cmd_registry_list(&config, output_format),
        },

        Commands::Pending { action } => match action {
            PendingAction::List => cmd_pending_list(&config, output_format),
        },

        Commands::Review { action } => match action {
            ReviewAction::Approve { id, reviewer } => {
                cmd_review_approve(&config, &id, &reviewer)
            }
        },

        Commands::History { limit } => cmd_history(&config, output_format, limit),

        Commands::Show { id } => cmd_show(&config, output_format, &id),

        Commands::Config {
            show,
            set_store_dir,
            set_registry_seed,
            set_output,
            set_log_level,
            set_tolerance,
            reset,
        } => cmd_config(
            &config_path,
            show,
            set_store_dir,
            set_registry_seed,
            set_output,
            set_log_level,
            set_tolerance,
            reset,
        ),
    }
}

/// Configuration for the session. `config` reads and writes the file on its
/// own, so a file that no longer parses can still be reset.
fn startup_config(command: &Commands, config_path: &Path) -> Result<Config> {
    match command {
        Commands::Config { .. } => Ok(Config::default()),
        _ => Config::load_from(config_path),
    }
}

fn cmd_check(
    config: &Config,
    output_format: OutputFormat,
    request_path: &Path,
    readings_path: Option<&Path>,
    save: bool,
) -> Result<()> {
    let mut request = WeighRequest::load_from_file(request_path)?;
    if let Some(path) = readings_path {
        let import = ReadingsImport::load_from_file(path)?;
        request.readings = import.apply_to(request.readings);
        debug!(readings = %path.display(), "readings replaced from CSV");
    }

    let registry = repository::open_spec_registry(config)?;
    let queue = repository::open_pending_queue(config)?;
    let calculator = DeltaCalculator::new(config.combination_tolerance_percent);

    let outcome = run_weigh_check(&request, &registry, &queue, &calculator)?;

    if save {
        let repo = repository::open_weigh_result_repo(config)?;
        save_result(&repo, &outcome.result)?;
        info!(id = %outcome.result.id, "weigh result saved");
    }

    output::output_outcome(output_format, &outcome)?;
    if save && output_format != OutputFormat::Json {
        println!("Saved as {}", outcome.result.id);
    }
    Ok(())
}

fn cmd_resolve(
    config: &Config,
    output_format: OutputFormat,
    kind: KindArg,
    args: ResolveArgs,
) -> Result<()> {
    let registry = repository::open_spec_registry(config)?;
    let report = match kind {
        KindArg::Vehicle => lookup::<VehicleCapacities, _>(&registry, args)?,
        KindArg::Caravan => lookup::<CaravanCapacities, _>(&registry, args)?,
    };
    output::output_lookup(output_format, &report)
}

fn lookup<C, R>(registry: &R, args: ResolveArgs) -> Result<LookupReport>
where
    C: CapacitySet,
    R: SpecRegistry + ?Sized,
{
    let resolver = SpecResolver::new(registry);
    let found = match (args.plate, args.state, args.make, args.model, args.year) {
        (Some(plate), Some(state), _, _, _) => resolver.resolve_by_plate::<C>(&plate, &state)?,
        (_, _, Some(make), Some(model), Some(year)) => {
            let mut key = SpecKey::new(make, model, year);
            if let Some(variant) = args.variant {
                key = key.with_variant(variant);
            }
            resolver.resolve::<C>(&key)?
        }
        _ => {
            return Err(ComplianceError::MissingRequiredInput(
                "--plate with --state, or --make, --model and --year".to_string(),
            )
            .into())
        }
    };

    Ok(match found {
        SpecLookup::Complete(record) => LookupReport {
            status: "complete",
            record: Some(record.into_stored()),
            missing: Vec::new(),
        },
        SpecLookup::IncompleteFound { record, missing } => LookupReport {
            status: "incomplete",
            record: Some(record.into_stored()),
            missing,
        },
        SpecLookup::NotFound => LookupReport {
            status: "not found",
            record: None,
            missing: Vec::new(),
        },
    })
}

fn cmd_registry_import(config: &Config, seed: &Path) -> Result<()> {
    let registry = repository::open_spec_registry(config)?;
    let count = review_service::import_registry_seed(&registry, seed)?;
    println!(
        "Imported {} record(s) into {}",
        count,
        registry.store_path().display()
    );
    Ok(())
}

fn cmd_registry_list(config: &Config, output_format: OutputFormat) -> Result<()> {
    let registry = repository::open_spec_registry(config)?;
    let specs = registry.find_all()?;
    output::output_specs(output_format, "Registry", &specs)
}

fn cmd_pending_list(config: &Config, output_format: OutputFormat) -> Result<()> {
    let queue = repository::open_pending_queue(config)?;
    let pending = review_service::list_pending(&queue)?;
    output::output_specs(output_format, "Pending Review", &pending)
}

fn cmd_review_approve(config: &Config, id: &str, reviewer: &str) -> Result<()> {
    let registry = repository::open_spec_registry(config)?;
    let queue = repository::open_pending_queue(config)?;
    let approved = review_service::approve_submission(&registry, &queue, id, reviewer)?;
    println!(
        "Approved {} {} ({}) by {}",
        approved.kind(),
        approved.key(),
        approved.provenance(),
        reviewer
    );
    Ok(())
}

fn cmd_history(config: &Config, output_format: OutputFormat, limit: usize) -> Result<()> {
    let repo = repository::open_weigh_result_repo(config)?;
    let total = repo.find_all()?.len();
    let results = repo.recent(limit)?;
    output::output_history(output_format, &results, total)
}

fn cmd_show(config: &Config, output_format: OutputFormat, id: &str) -> Result<()> {
    let repo = repository::open_weigh_result_repo(config)?;
    let result = repo
        .find_by_id(id)?
        .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
    output::output_result(output_format, &result)
}

#[allow(clippy::too_many_arguments)]
fn cmd_config(
    config_path: &Path,
    show: bool,
    set_store_dir: Option<PathBuf>,
    set_registry_seed: Option<PathBuf>,
    set_output: Option<OutputFormat>,
    set_log_level: Option<String>,
    set_tolerance: Option<f64>,
    reset: bool,
) -> Result<()> {
    if reset {
        let config = Config::default();
        config.save_to(config_path)?;
        println!("Configuration reset to defaults");
        println!("\n{}", config);
        return Ok(());
    }

    let mut config = Config::load_from(config_path)?;
    let mut modified = false;

    if let Some(dir) = set_store_dir {
        config.store_dir = Some(dir);
        modified = true;
    }

    if let Some(seed) = set_registry_seed {
        config.registry_seed = Some(seed);
        modified = true;
    }

    if let Some(output_format) = set_output {
        config.output_format = output_format;
        modified = true;
    }

    if let Some(level) = set_log_level {
        config.log_level = level;
        modified = true;
    }

    if let Some(tolerance) = set_tolerance {
        config.combination_tolerance_percent = tolerance;
        modified = true;
    }

    if modified {
        config.save_to(config_path)?;
        println!("Configuration updated");
    }

    if show || !modified {
        println!("\n{}", config);
        println!("Config file: {}", config_path.display());
    }

    Ok(())
}
