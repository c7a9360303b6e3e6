use clap::Parser;
use std::sync::Arc;
use tsunami_workflow::utils::error::ErrorSeverity;
use tsunami_workflow::utils::{logger, validation::Validate};
use tsunami_workflow::{
    CliArgs, DirectoryLayout, RunConfig, ScenarioPipeline, StageKind, SystemProcessRunner,
    WorkflowError,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // 初始化日誌
    if args.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting tsunami-workflow");
    tracing::info!("📁 Loading configuration from: {}", args.config.display());

    let mut config = match RunConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config.display(), e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 套用命令列覆蓋設定並驗證，之後設定不再變動
    if let Err(e) = args.apply_overrides(&mut config).and_then(|_| config.validate()) {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }
    let config = config;

    tracing::info!("✅ Configuration loaded and validated successfully");
    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - no directories are created and nothing is executed");
        perform_dry_run(&config);
        return Ok(());
    }

    let mut pipeline = ScenarioPipeline::new(&config, Arc::new(SystemProcessRunner));

    match pipeline.execute_all().await {
        Ok(summary) => {
            if let Some(path) = &args.summary_json {
                std::fs::write(path, summary.to_json_pretty()?)?;
                tracing::info!("📝 Run summary written to {}", path.display());
            }
            println!(
                "✅ Done running workflow for scenario '{}' ({} stage(s) executed, {} skipped)",
                summary.scenario,
                summary.stages.len(),
                summary.skipped.len()
            );
            for report in &summary.stages {
                match &report.prefix {
                    Some(prefix) => println!(
                        "📁 {} outputs: {} (prefix '{}')",
                        report.stage,
                        report.output_dir.display(),
                        prefix
                    ),
                    None => println!("📁 {} outputs: {}", report.stage, report.output_dir.display()),
                }
            }
        }
        Err(e) => report_failure(&e),
    }

    Ok(())
}

fn report_failure(e: &WorkflowError) -> ! {
    tracing::error!(
        "❌ Workflow failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼，流程失敗一律非零
    let exit_code = match e.severity() {
        ErrorSeverity::Low | ErrorSeverity::High => 1,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code);
}

fn display_config_summary(config: &RunConfig, args: &CliArgs) {
    let enabled: Vec<String> = config
        .enabled_stages()
        .iter()
        .map(ToString::to_string)
        .collect();

    println!("📋 Configuration Summary:");
    println!("  Scenario: {}", config.scenario.name);
    println!("  Inputs: {}", config.scenario.input_dir.display());
    println!("  Outputs: {}", config.scenario.output_dir.display());
    println!("  Existing directories: {:?}", config.scenario.existing_dir_policy);
    println!(
        "  Stages: {}",
        if enabled.is_empty() {
            "none".to_string()
        } else {
            enabled.join(" -> ")
        }
    );
    if config.interface_module.enabled || config.hysea.enabled {
        println!(
            "  Filter: {}, resolution: {} m (prefix '{}')",
            config.interface_module.filter,
            config.interface_module.resolution,
            config.interface_module.filename_prefix()
        );
    }

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

fn perform_dry_run(config: &RunConfig) {
    let layout = DirectoryLayout::resolve(
        &config.scenario.input_dir,
        &config.scenario.output_dir,
        &config.scenario.name,
    );

    println!("🔍 Dry Run Analysis:");
    println!();
    println!("📂 Directory Layout:");
    println!("  Scenario: {}", layout.scenario_dir().display());
    for kind in StageKind::ALL {
        let marker = if config.is_enabled(kind) { "▶️" } else { "⏭️" };
        print!("  {} {}: {}", marker, kind, layout.stage_output(kind).display());
        if let Some(input) = layout.stage_input(kind) {
            print!(" (inputs: {})", input.display());
        }
        println!();
    }

    println!();
    println!("⚙️ Planned Stages:");
    if config.bingclaw.enabled {
        println!(
            "  BingClaw: {} image {}",
            config.bingclaw.image_type.program(),
            config.bingclaw.image.as_deref().unwrap_or("<unset>")
        );
        println!(
            "    initial condition: {}",
            config.bingclaw.initial_condition_file(&config.scenario.name)
        );
    }
    if config.interface_module.enabled {
        println!(
            "  Interface Module: {} {} --donor {}",
            config.interface_module.program,
            config.interface_module.script.display(),
            config.interface_module.donor
        );
        if let Some(trim) = &config.interface_module.deformation_trim {
            println!("    deformation trim: {} {}", trim.program, trim.args.join(" "));
        }
    }
    if config.hysea.enabled {
        println!(
            "  T-HySEA: {} -np {} {}",
            config.hysea.mpi_launcher,
            config.hysea.processes,
            config
                .hysea
                .executable
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<unset>".to_string())
        );
        println!("    template: {}", config.hysea.selected_template());
    }

    println!();
    println!("✅ Dry run analysis complete. Use --verbose for more details during the actual run.");
}
