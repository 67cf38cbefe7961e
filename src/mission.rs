//! # Mission モジュール
//!
//! シナリオ設定から経路計画までを一括で実行するエンジンを提供します。
//!
//! ## 処理順序
//!
//! 1. **センサー準備**: 指定レーダーの読み込みとランダム配置
//! 2. **検知マップ生成**: 全センサーの最大検知レベルを正規化
//! 3. **グラフ構築**: 許容値未満のセルと4近傍エッジ
//! 4. **経路計画**: POIの訪問順決定と区間ごとのA*探索
//! 5. **コスト監査**: 経路上のエッジ重みの再集計
//!
//! 各段階の成果物は上流を変更せず、次の段階へ読み取り専用で渡されます。

use rand::{rngs::StdRng, SeedableRng};
use tracing::{debug, info, warn};

use crate::models::*;
use crate::scenario::ScenarioConfig;

/// 実行結果のまとめ
#[derive(Debug, Clone)]
pub struct MissionReport {
    pub field: DetectionField,
    pub graph: RiskGraph,
    pub planned: PlannedRoute,
    pub route_cost: Option<f64>,
    pub sensor_count: usize,
    pub heuristic: Heuristic,
    pub poi_cells: Vec<GridCell>,
}

impl MissionReport {
    /// 結果の概要を表示
    pub fn print_summary(&self) {
        let (raw_min, raw_max) = self.field.raw_range();
        let cells = self.field.cells();
        let mean = cells.iter().sum::<f64>() / cells.len().max(1) as f64;

        println!("=== 検知マップ ===");
        println!("グリッド: {} × {} セル", self.field.height(), self.field.width());
        println!("センサー: {}基", self.sensor_count);
        println!("検知レベル: min {:.4e} / max {:.4e}", raw_min, raw_max);
        println!("最小検知確率: {:.6}", self.field.min_probability());
        println!("平均検知確率: {:.6}", mean);
        println!();

        println!("=== グラフ ===");
        println!("許容値: {:.4}", self.graph.tolerance());
        println!("ノード: {} / {}", self.graph.node_count(), self.field.grid().cell_count());
        println!("エッジ: {}", self.graph.edge_count());
        println!();

        println!("=== 経路 ===");
        println!("ヒューリスティック: {}", self.heuristic);
        if self.planned.is_empty() {
            println!("実行可能な経路が見つかりませんでした");
        } else {
            println!("区間数: {}", self.planned.route.segment_count());
            for (i, segment) in self.planned.route.segments.iter().enumerate() {
                if let (Some(first), Some(last)) = (segment.first(), segment.last()) {
                    println!("  区間 {}: {} -> {} ({}セル)", i, first, last, segment.len());
                }
            }
            if let Some(cost) = self.route_cost {
                println!("総コスト: {:.6}", cost);
            }
        }
        println!("ヒューリスティック評価回数 (近似): {}", self.planned.heuristic_calls);
        println!("展開ノード数: {}", self.planned.nodes_expanded);
    }
}

pub struct MissionEngine {
    pub scenario_config: ScenarioConfig,
    pub verbose_level: u8,
    pub sensors: Vec<Radar>,
    pub context: Option<SearchContext>,
}

impl MissionEngine {
    pub fn new(scenario: ScenarioConfig, verbose_level: u8) -> Self {
        Self {
            scenario_config: scenario,
            verbose_level,
            sensors: Vec::new(),
            context: None,
        }
    }

    /// センサーを準備する（指定レーダー + シード付き乱数でのランダム配置）
    pub fn initialize(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let config = &self.scenario_config;
        self.sensors = config.sensors.radars.iter().map(Radar::from).collect();

        if config.sensors.random_count > 0 {
            let grid = GridSpec::new(config.boundary(), config.map.height, config.map.width);
            let mut rng = StdRng::seed_from_u64(config.sensors.seed);
            let generated = generate_sensors(&grid, config.sensors.random_count, &mut rng)?;
            self.sensors.extend(generated);
        }

        if self.verbose_level > 0 {
            info!("センサー準備完了: {}基", self.sensors.len());
        }
        for sensor in &self.sensors {
            let location = sensor.get_location();
            debug!("センサー {} (lat, lon) = ({:.5}, {:.5})", sensor.get_id(), location.latitude, location.longitude);
        }

        Ok(())
    }

    /// 検知マップ生成から経路計画・コスト監査までを実行
    pub fn run(&mut self) -> Result<MissionReport, Box<dyn std::error::Error>> {
        let config = &self.scenario_config;
        let boundary = config.boundary();
        let (height, width) = (config.map.height, config.map.width);
        let heuristic: Heuristic = config.planning.heuristic.parse()?;
        let tolerance = config.planning.tolerance;

        info!("=== 経路計画開始 ===");

        let field = compute_detection_field(&boundary, height, width, &self.sensors)?;
        let graph = build_graph(&field, tolerance);
        if graph.is_empty() {
            warn!("許容値 {:.4} ではグラフにノードがありません", tolerance);
        }

        // 同じエンジンで再実行した場合もカウンタは累積する
        let context = self
            .context
            .get_or_insert_with(|| SearchContext::new(field.min_probability()));
        context.min_probability = field.min_probability();

        let pois = config.pois();
        let planned = plan_route(
            &graph,
            &heuristic,
            &pois,
            config.planning.start_index,
            &boundary,
            width,
            height,
            context,
        );

        let route_cost = if planned.is_empty() {
            None
        } else {
            Some(compute_route_cost(&graph, &planned.route)?)
        };

        let poi_cells = pois
            .iter()
            .filter_map(|poi| to_grid_coordinates(poi, &boundary, width, height))
            .collect();

        info!("=== 経路計画完了 ===");

        Ok(MissionReport {
            field,
            graph,
            planned,
            route_cost,
            sensor_count: self.sensors.len(),
            heuristic,
            poi_cells,
        })
    }

    /// 累積カウンタをリセットする
    pub fn reset_counters(&mut self) {
        if let Some(context) = self.context.as_mut() {
            context.reset();
        }
    }
}

/// 検知マップ・グラフ・経路をテキストで描画
///
/// `#` 除外セル、`.` 通行可能セル、`*` 経路上のセル、`P` POIのセル。
/// 行0（最小緯度）を最下段に描く。
pub fn render_ascii(field: &DetectionField, graph: &RiskGraph, route: &Route, poi_cells: &[GridCell]) -> String {
    let on_route: std::collections::HashSet<GridCell> = route.cells().into_iter().collect();
    let mut output = String::with_capacity((field.width() + 1) * field.height());

    for row in (0..field.height()).rev() {
        for col in 0..field.width() {
            let cell = GridCell::new(row, col);
            let symbol = if poi_cells.contains(&cell) {
                'P'
            } else if on_route.contains(&cell) {
                '*'
            } else if graph.contains_node(cell) {
                '.'
            } else {
                '#'
            };
            output.push(symbol);
        }
        output.push('\n');
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::ScenarioConfig;

    const SAMPLE: &str = r#"
meta: { version: "1.0", name: corridor, description: single radar in the middle }
map:
  boundary: { min_lat: 0.0, max_lat: 0.04, min_lon: 0.0, max_lon: 0.04 }
  height: 5
  width: 5
sensors:
  seed: 9
  radars:
    - id: R001
      location: { latitude: 0.02, longitude: 0.02 }
      transmission_power_w: 1000.0
      antenna_gain: 30.0
      wavelength_m: 0.1
      cross_section_m2: 1.0
      minimum_signal_w: 1.0e-13
      total_loss: 1.0
planning:
  tolerance: 0.5
  heuristic: h1
  start_index: 0
  pois:
    - { latitude: 0.0, longitude: 0.0 }
    - { latitude: 0.04, longitude: 0.04 }
"#;

    #[test]
    fn test_run_sample_scenario() {
        let config = ScenarioConfig::from_yaml_str(SAMPLE).unwrap();
        let mut engine = MissionEngine::new(config, 0);
        engine.initialize().unwrap();
        assert_eq!(engine.sensors.len(), 1);

        let report = engine.run().unwrap();
        assert_eq!(report.planned.route.segment_count(), 1);
        assert!(!report.graph.contains_node(GridCell::new(2, 2)));
        assert_eq!(report.graph.tolerance(), 0.5);
        assert!(report.route_cost.unwrap() > 0.0);
        assert_eq!(report.poi_cells, vec![GridCell::new(0, 0), GridCell::new(4, 4)]);

        let picture = render_ascii(&report.field, &report.graph, &report.planned.route, &report.poi_cells);
        assert_eq!(picture.lines().count(), 5);
        assert_eq!(picture.lines().nth(2).unwrap().chars().nth(2), Some('#'));
        assert!(picture.lines().all(|line| line.len() == 5));
    }

    #[test]
    fn test_counters_accumulate_across_runs() {
        let config = ScenarioConfig::from_yaml_str(SAMPLE).unwrap();
        let mut engine = MissionEngine::new(config, 0);
        engine.initialize().unwrap();

        let first = engine.run().unwrap().planned.nodes_expanded;
        let second = engine.run().unwrap().planned.nodes_expanded;
        assert_eq!(second, first * 2);

        engine.reset_counters();
        assert_eq!(engine.run().unwrap().planned.nodes_expanded, first);
    }

    #[test]
    fn test_demo_scenario_runs() {
        let mut engine = MissionEngine::new(ScenarioConfig::demo(), 0);
        engine.initialize().unwrap();
        assert_eq!(engine.sensors.len(), 4);

        let report = engine.run().unwrap();
        assert_eq!(report.field.cells().len(), 40 * 50);
        assert!(report.field.cells().iter().all(|&v| (EPSILON..=1.0).contains(&v)));
        assert_eq!(report.route_cost.is_some(), !report.planned.is_empty());
    }

    #[test]
    fn test_overflowing_radar_keeps_field_in_bounds() {
        let yaml = SAMPLE.replace("minimum_signal_w: 1.0e-13", "minimum_signal_w: 1.0e-308");
        let config = ScenarioConfig::from_yaml_str(&yaml).unwrap();
        let mut engine = MissionEngine::new(config, 0);
        engine.initialize().unwrap();

        let report = engine.run().unwrap();
        assert!(report.field.cells().iter().all(|&v| (EPSILON..=1.0).contains(&v)));
        assert!((report.field.value(GridCell::new(2, 2)).unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(report.planned.route.segment_count(), 1);
        assert!(report.route_cost.unwrap().is_finite());
    }

    #[test]
    fn test_too_many_random_sensors() {
        let mut config = ScenarioConfig::from_yaml_str(SAMPLE).unwrap();
        config.sensors.random_count = 6;
        let mut engine = MissionEngine::new(config, 0);
        assert!(engine.initialize().is_err());
    }
}
