mod logging;
mod mission;
mod models;
mod scenario;

use clap::{Arg, Command};
use logging::{init_logging, parse_log_level, LogConfig, LogOutput};
use mission::{render_ascii, MissionEngine};
use scenario::*;

fn main() {
    // コマンドライン引数の解析
    let matches = Command::new("radarpath")
        .version("0.1.0")
        .about("レーダー回避経路計画 (Radar-Aware Route Planning)")
        .long_about("レーダー検知マップに基づく経路計画ツール\n\
                     検知確率が許容値未満のセルだけを通り、複数のPOIを巡る低リスク経路を探索します。")
        .arg(
            Arg::new("scenario")
                .short('s')
                .long("scenario")
                .value_name("FILE")
                .help("シナリオファイル(.yaml)のパスを指定")
                .conflicts_with("demo")
        )
        .arg(
            Arg::new("demo")
                .short('d')
                .long("demo")
                .action(clap::ArgAction::SetTrue)
                .help("組み込みのデモシナリオを実行")
        )
        .arg(
            Arg::new("info")
                .short('i')
                .long("info")
                .action(clap::ArgAction::SetTrue)
                .help("シナリオの情報のみ表示して終了")
        )
        .arg(
            Arg::new("heuristic")
                .short('H')
                .long("heuristic")
                .value_name("NAME")
                .value_parser(["h1", "h2", "manhattan", "euclidean"])
                .help("ヒューリスティックを上書き (h1: マンハッタン, h2: ユークリッド)")
        )
        .arg(
            Arg::new("tolerance")
                .short('T')
                .long("tolerance")
                .value_name("VALUE")
                .value_parser(clap::value_parser!(f64))
                .help("検知確率の許容値を上書き")
        )
        .arg(
            Arg::new("map")
                .short('m')
                .long("map")
                .action(clap::ArgAction::SetTrue)
                .help("結果の後に検知マップと経路をテキストで表示")
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(clap::ArgAction::Count)
                .help("詳細出力レベル (-v: 基本, -vv: 詳細, -vvv: トレース)")
        )
        .arg(
            Arg::new("log-output")
                .long("log-output")
                .value_name("TARGET")
                .default_value("console")
                .help("ログ出力先 (console, file, both)")
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("ログレベル (trace, debug, info, warn, error)。-v より優先")
        )
        .get_matches();

    println!("レーダー回避経路計画 - radarpath v0.1.0");
    println!();

    let verbose_level = matches.get_count("verbose");

    // ログ設定（ガードは終了まで保持する）
    let _guard = match build_log_config(&matches, verbose_level).and_then(|config| init_logging(&config)) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("ログ初期化エラー: {}", e);
            std::process::exit(1);
        }
    };

    let overrides = Overrides {
        heuristic: matches.get_one::<String>("heuristic").cloned(),
        tolerance: matches.get_one::<f64>("tolerance").copied(),
        show_map: matches.get_flag("map"),
    };
    let info_only = matches.get_flag("info");

    let result = if matches.get_flag("demo") {
        execute_scenario(ScenarioConfig::demo(), &overrides, info_only, verbose_level)
    } else if let Some(scenario_path) = matches.get_one::<String>("scenario") {
        run_scenario(scenario_path, &overrides, info_only, verbose_level)
    } else {
        // デフォルト動作: 使用方法を表示
        show_default_help();
        return;
    };

    if let Err(e) = result {
        eprintln!("エラー: {}", e);
        std::process::exit(1);
    }
}

/// コマンドラインからの設定上書き
struct Overrides {
    heuristic: Option<String>,
    tolerance: Option<f64>,
    show_map: bool,
}

fn build_log_config(matches: &clap::ArgMatches, verbose_level: u8) -> Result<LogConfig, Box<dyn std::error::Error>> {
    let mut config = LogConfig::default().with_verbosity(verbose_level);

    if let Some(output) = matches.get_one::<String>("log-output") {
        config.output = output.parse::<LogOutput>()?;
    }
    if let Some(level) = matches.get_one::<String>("log-level") {
        config.level = parse_log_level(level).ok_or_else(|| format!("無効なログレベル: {}", level))?;
    }

    Ok(config)
}

/// シナリオファイルを読み込んで実行
fn run_scenario(
    scenario_path: &str,
    overrides: &Overrides,
    info_only: bool,
    verbose_level: u8,
) -> Result<(), Box<dyn std::error::Error>> {
    let scenario = ScenarioConfig::from_file(scenario_path)?;

    if verbose_level > 0 {
        println!("シナリオファイル読み込み完了: {}", scenario_path);
    }

    execute_scenario(scenario, overrides, info_only, verbose_level)
}

/// シナリオの実行（上書き適用 → 検証 → 実行）
fn execute_scenario(
    mut scenario: ScenarioConfig,
    overrides: &Overrides,
    info_only: bool,
    verbose_level: u8,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(heuristic) = &overrides.heuristic {
        scenario.planning.heuristic = heuristic.clone();
    }
    if let Some(tolerance) = overrides.tolerance {
        scenario.planning.tolerance = tolerance;
    }
    scenario.validate()?;

    scenario.print_summary();
    println!();

    // 情報表示のみの場合
    if info_only {
        return Ok(());
    }

    let mut engine = MissionEngine::new(scenario, verbose_level);
    engine.initialize()?;

    let report = engine.run()?;
    report.print_summary();

    if overrides.show_map {
        println!();
        println!("=== 検知マップ (#: 除外, .: 通行可, *: 経路, P: POI) ===");
        print!("{}", render_ascii(&report.field, &report.graph, &report.planned.route, &report.poi_cells));
    }

    Ok(())
}

/// 使用方法を表示
fn show_default_help() {
    println!("使用方法:");
    println!("  radarpath [オプション]");
    println!();
    println!("オプション:");
    println!("  -s, --scenario <FILE>     シナリオファイルを指定して実行");
    println!("  -d, --demo                組み込みのデモシナリオを実行");
    println!("  -i, --info                シナリオ情報のみ表示");
    println!("  -H, --heuristic <NAME>    ヒューリスティックを上書き (h1, h2)");
    println!("  -T, --tolerance <VALUE>   許容値を上書き");
    println!("  -m, --map                 検知マップと経路をテキストで表示");
    println!("  -v, --verbose             詳細出力 (複数指定で詳細レベル上昇)");
    println!("      --log-output <TARGET> ログ出力先 (console, file, both)");
    println!("      --log-level <LEVEL>   ログレベル");
    println!("  -h, --help                このヘルプを表示");
    println!();
    println!("例:");
    println!("  radarpath --demo -m");
    println!("  radarpath -s scenarios/corridor.yaml -v");
    println!("  radarpath -s scenarios/corridor.yaml -H h2 -T 0.3");
    println!("  radarpath -s scenarios/corridor.yaml -i");
}
