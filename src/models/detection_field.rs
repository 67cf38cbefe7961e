use tracing::{debug, trace};

use crate::models::{
    common::{Boundary, GridCell, GridSpec, EPSILON},
    errors::PlanningError,
    traits::ISensor,
};

/// 検知確率マップ
///
/// height×width のグリッドで、各セルはいずれかのセンサーに検知される
/// 確率（正規化済み）を持ちます。全セルの値は `[EPSILON, 1]` に収まり、
/// 生成後は変更されません。
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionField {
    /// グリッド定義（座標との対応）
    grid: GridSpec,
    /// 行優先で並んだ正規化済み検知確率
    cells: Vec<f64>,
    /// 正規化後の最小値（ヒューリスティックのスケール係数）
    min_probability: f64,
    /// 正規化前の最小検知レベル
    raw_min: f64,
    /// 正規化前の最大検知レベル
    raw_max: f64,
}

impl DetectionField {
    /// グリッド定義を取得
    pub fn grid(&self) -> &GridSpec {
        &self.grid
    }

    pub fn height(&self) -> usize {
        self.grid.height
    }

    pub fn width(&self) -> usize {
        self.grid.width
    }

    /// セルの検知確率を取得（グリッド外は None）
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.grid.height && col < self.grid.width {
            Some(self.cells[row * self.grid.width + col])
        } else {
            None
        }
    }

    /// セルの検知確率を取得
    pub fn value(&self, cell: GridCell) -> Option<f64> {
        self.get(cell.row, cell.col)
    }

    /// フィールド全体の最小検知確率
    pub fn min_probability(&self) -> f64 {
        self.min_probability
    }

    /// 正規化前の検知レベル範囲 (min, max)
    pub fn raw_range(&self) -> (f64, f64) {
        (self.raw_min, self.raw_max)
    }

    /// 行優先のセル値スライス
    pub fn cells(&self) -> &[f64] {
        &self.cells
    }

    /// 全セルを (セル, 検知確率) の組で列挙（行優先）
    pub fn iter(&self) -> impl Iterator<Item = (GridCell, f64)> + '_ {
        let width = self.grid.width;
        self.cells
            .iter()
            .enumerate()
            .map(move |(idx, &value)| (GridCell::new(idx / width, idx % width), value))
    }
}

/// 検知確率マップを計算します
///
/// 各セルの座標について全センサーの検知レベルを求め、その最大値を
/// セルの生の値とします（どれか1基にでも検知されれば検知とみなす）。
/// 全セルを埋めた後、最小値・最大値で `[EPSILON, 1]` に正規化します。
/// センサーが返す非有限値は、NaNを0、+∞を `f64::MAX` として扱います。
/// 全セルが同じ値の場合はゼロ除算を避けて全セルを `EPSILON` にします。
///
/// # 引数
///
/// * `boundary` - 地図の境界
/// * `height` - 緯度方向のセル数
/// * `width` - 経度方向のセル数
/// * `sensors` - 検知源のスライス
///
/// # 戻り値
///
/// 正規化済みの検知確率マップ。`sensors` が空の場合は `PlanningError::EmptyInput`
pub fn compute_detection_field<S: ISensor>(
    boundary: &Boundary,
    height: usize,
    width: usize,
    sensors: &[S],
) -> Result<DetectionField, PlanningError> {
    if sensors.is_empty() {
        return Err(PlanningError::EmptyInput);
    }

    let grid = GridSpec::new(*boundary, height, width);
    let mut cells = Vec::with_capacity(grid.cell_count());

    for row in 0..height {
        for col in 0..width {
            let location = grid.cell_location(GridCell::new(row, col));
            let max_level = sensors
                .iter()
                .map(|sensor| finite_level(sensor.detection_level(&location)))
                .fold(0.0, f64::max);
            cells.push(max_level);
        }
    }

    let raw_min = cells.iter().copied().fold(f64::INFINITY, f64::min);
    let raw_max = cells.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    debug!(
        "検知レベル範囲: min = {:.6e}, max = {:.6e} ({}×{}セル, センサー{}基)",
        raw_min, raw_max, height, width, sensors.len()
    );

    let uniform = raw_max == raw_min;
    for value in cells.iter_mut() {
        *value = if uniform {
            EPSILON
        } else {
            ((*value - raw_min) / (raw_max - raw_min) * (1.0 - EPSILON) + EPSILON).clamp(EPSILON, 1.0)
        };
    }

    let min_probability = cells.iter().copied().fold(f64::INFINITY, f64::min);
    trace!("正規化後の最小検知確率: {:.6}", min_probability);

    Ok(DetectionField {
        grid,
        cells,
        min_probability: if min_probability.is_finite() { min_probability } else { EPSILON },
        raw_min,
        raw_max,
    })
}

/// 生の検知レベルを有限の非負値にそろえる（NaNは0、+∞は `f64::MAX`）
fn finite_level(level: f64) -> f64 {
    if level.is_nan() {
        0.0
    } else {
        level.clamp(0.0, f64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::common::Location;
    use crate::models::sensor::Radar;

    /// 位置に依存しない一定の検知レベルを返すテスト用センサー
    struct ConstantSensor(f64);

    impl ISensor for ConstantSensor {
        fn detection_level(&self, _location: &Location) -> f64 {
            self.0
        }

        fn get_id(&self) -> String {
            "CONST".to_string()
        }

        fn get_location(&self) -> Location {
            Location::new(0.0, 0.0)
        }
    }

    /// 経度が大きいほど検知レベルが上がるテスト用センサー
    struct GradientSensor {
        scale: f64,
    }

    impl ISensor for GradientSensor {
        fn detection_level(&self, location: &Location) -> f64 {
            location.longitude * self.scale
        }

        fn get_id(&self) -> String {
            "GRAD".to_string()
        }

        fn get_location(&self) -> Location {
            Location::new(0.0, 0.0)
        }
    }

    /// 設置位置からの距離に比例して検知レベルが下がるテスト用センサー
    struct ConeSensor {
        location: Location,
        peak: f64,
    }

    impl ISensor for ConeSensor {
        fn detection_level(&self, location: &Location) -> f64 {
            (self.peak - self.location.distance(location)).max(0.0)
        }

        fn get_id(&self) -> String {
            "CONE".to_string()
        }

        fn get_location(&self) -> Location {
            self.location
        }
    }

    /// 原点でだけ +∞、それ以外で有限値を返すテスト用センサー
    struct SingularSensor;

    impl ISensor for SingularSensor {
        fn detection_level(&self, location: &Location) -> f64 {
            let distance = location.distance(&Location::new(0.0, 0.0));
            if distance == 0.0 { f64::INFINITY } else { 1.0 / distance }
        }

        fn get_id(&self) -> String {
            "SING".to_string()
        }

        fn get_location(&self) -> Location {
            Location::new(0.0, 0.0)
        }
    }

    fn unit_boundary() -> Boundary {
        Boundary::new(0.0, 4.0, 0.0, 4.0)
    }

    fn center_radar() -> Radar {
        Radar::new("R001".to_string(), Location::new(2.0, 2.0))
            .with_transmission_power(5000.0)
            .with_antenna_gain(20.0)
            .with_minimum_signal(1e-13)
    }

    #[test]
    fn test_empty_sensors_is_error() {
        let sensors: Vec<Radar> = Vec::new();
        let result = compute_detection_field(&unit_boundary(), 5, 5, &sensors);
        assert_eq!(result, Err(PlanningError::EmptyInput));
    }

    #[test]
    fn test_uniform_field_is_epsilon() {
        let sensors = vec![ConstantSensor(3.5), ConstantSensor(3.5)];
        let field = compute_detection_field(&unit_boundary(), 4, 6, &sensors).unwrap();

        assert!(field.cells().iter().all(|&v| v == EPSILON));
        assert_eq!(field.min_probability(), EPSILON);
        assert_eq!(field.cells().len(), 24);
    }

    #[test]
    fn test_values_within_bounds() {
        let boundary = Boundary::new(40.0, 40.5, -3.8, -3.2);
        let sensors = vec![
            Radar::new("R001".to_string(), Location::new(40.1, -3.7)).with_transmission_power(800.0),
            Radar::new("R002".to_string(), Location::new(40.4, -3.3)).with_antenna_gain(40.0),
        ];
        let field = compute_detection_field(&boundary, 12, 9, &sensors).unwrap();

        for (_, value) in field.iter() {
            assert!(value >= EPSILON && value <= 1.0, "範囲外の値: {}", value);
        }
        let max = field.cells().iter().copied().fold(f64::NEG_INFINITY, f64::max);
        assert!((max - 1.0).abs() < 1e-12);
        assert!((field.min_probability() - EPSILON).abs() < 1e-12);
    }

    #[test]
    fn test_cell_takes_max_over_sensors() {
        let sensors: Vec<Box<dyn ISensor>> = vec![
            Box::new(GradientSensor { scale: 1.0 }),
            Box::new(ConstantSensor(2.0)),
        ];
        let field = compute_detection_field(&unit_boundary(), 1, 5, &sensors).unwrap();

        // 経度0〜2の列は一定センサー(2.0)が最大、3〜4の列は勾配センサーが最大
        let expected: Vec<f64> = [2.0, 2.0, 2.0, 3.0, 4.0]
            .iter()
            .map(|raw| (raw - 2.0) / 2.0 * (1.0 - EPSILON) + EPSILON)
            .collect();
        for (got, want) in field.cells().iter().zip(expected.iter()) {
            assert!((got - want).abs() < 1e-12, "{} != {}", got, want);
        }
        assert_eq!(field.raw_range(), (2.0, 4.0));
    }

    #[test]
    fn test_single_sensor_radial_falloff() {
        let sensor = ConeSensor { location: Location::new(2.0, 2.0), peak: 10.0 };
        let field = compute_detection_field(&unit_boundary(), 5, 5, &[sensor]).unwrap();
        let center = GridCell::new(2, 2);

        assert!((field.value(center).unwrap() - 1.0).abs() < 1e-12);
        for corner in [GridCell::new(0, 0), GridCell::new(0, 4), GridCell::new(4, 0), GridCell::new(4, 4)] {
            assert_eq!(field.value(corner), Some(EPSILON));
        }

        let cells: Vec<(GridCell, f64)> = field.iter().collect();
        for &(a, va) in &cells {
            for &(b, vb) in &cells {
                if a.manhattan_distance(&center) < b.manhattan_distance(&center) {
                    assert!(va > vb, "{} ({}) は {} ({}) より大きいはず", a, va, b, vb);
                }
            }
        }
    }

    #[test]
    fn test_infinite_level_stays_within_bounds() {
        let field = compute_detection_field(&Boundary::new(0.0, 2.0, 0.0, 2.0), 3, 3, &[SingularSensor]).unwrap();

        assert!(field.cells().iter().all(|&v| (EPSILON..=1.0).contains(&v)), "{:?}", field.cells());
        assert!((field.value(GridCell::new(0, 0)).unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(field.value(GridCell::new(2, 2)), Some(EPSILON));
        assert_eq!(field.raw_range().1, f64::MAX);
        assert!(field.min_probability().is_finite());
    }

    #[test]
    fn test_get_outside_grid() {
        let field = compute_detection_field(&unit_boundary(), 5, 5, &[center_radar()]).unwrap();
        assert!(field.get(5, 0).is_none());
        assert!(field.get(0, 5).is_none());
        assert!(field.get(4, 4).is_some());
        let (raw_min, raw_max) = field.raw_range();
        assert!(raw_min < raw_max);
    }
}
