use serde::{Deserialize, Serialize};
use std::path::Path;
use std::fs;

use crate::models::{Boundary, Location, Radar};

/// シナリオメタデータ
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioMeta {
    pub version: String,
    pub name: String,
    pub description: String,
}

/// 地図設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MapConfig {
    pub boundary: BoundaryConfig,
    pub height: usize,
    pub width: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BoundaryConfig {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct LocationConfig {
    pub latitude: f64,
    pub longitude: f64,
}

/// センサー設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SensorsConfig {
    pub seed: u64,
    #[serde(default)]
    pub random_count: usize,
    #[serde(default)]
    pub radars: Vec<RadarConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RadarConfig {
    pub id: String,
    pub location: LocationConfig,
    pub transmission_power_w: f64,
    pub antenna_gain: f64,
    pub wavelength_m: f64,
    pub cross_section_m2: f64,
    pub minimum_signal_w: f64,
    pub total_loss: f64,
}

/// 経路計画設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlanningConfig {
    pub tolerance: f64,
    pub heuristic: String,
    pub start_index: usize,
    pub pois: Vec<LocationConfig>,
}

/// 完全なシナリオ設定
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScenarioConfig {
    pub meta: ScenarioMeta,
    pub map: MapConfig,
    pub sensors: SensorsConfig,
    pub planning: PlanningConfig,
}

impl From<&BoundaryConfig> for Boundary {
    fn from(config: &BoundaryConfig) -> Self {
        Boundary::new(config.min_lat, config.max_lat, config.min_lon, config.max_lon)
    }
}

impl From<LocationConfig> for Location {
    fn from(config: LocationConfig) -> Self {
        Location::new(config.latitude, config.longitude)
    }
}

impl From<&RadarConfig> for Radar {
    fn from(config: &RadarConfig) -> Self {
        Radar::new(config.id.clone(), config.location.into())
            .with_transmission_power(config.transmission_power_w)
            .with_antenna_gain(config.antenna_gain)
            .with_wavelength(config.wavelength_m)
            .with_cross_section(config.cross_section_m2)
            .with_minimum_signal(config.minimum_signal_w)
            .with_total_loss(config.total_loss)
    }
}

impl RadarConfig {
    /// レーダーパラメータの検証（すべて有限の正の値であること）
    pub fn validate(&self) -> Result<(), ScenarioError> {
        let parameters = [
            ("transmission_power_w", self.transmission_power_w),
            ("antenna_gain", self.antenna_gain),
            ("wavelength_m", self.wavelength_m),
            ("cross_section_m2", self.cross_section_m2),
            ("minimum_signal_w", self.minimum_signal_w),
            ("total_loss", self.total_loss),
        ];

        for (name, value) in parameters {
            if !(value.is_finite() && value > 0.0) {
                return Err(ScenarioError::ValidationError(
                    format!("radar {}: {} must be a positive finite value (got {})", self.id, name, value)
                ));
            }
        }

        if !(self.location.latitude.is_finite() && self.location.longitude.is_finite()) {
            return Err(ScenarioError::ValidationError(
                format!("radar {}: location must be finite", self.id)
            ));
        }

        Ok(())
    }
}

impl ScenarioConfig {
    /// YAMLファイルからシナリオ設定を読み込み
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();

        // ファイル存在チェック
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.to_path_buf()));
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| ScenarioError::IoError(path.to_path_buf(), e))?;

        let config: ScenarioConfig = serde_yaml::from_str(&contents)
            .map_err(|e| ScenarioError::ParseError(path.to_path_buf(), e))?;

        config.validate()?;

        Ok(config)
    }

    /// YAML文字列からシナリオ設定を読み込み
    pub fn from_yaml_str(contents: &str) -> Result<Self, ScenarioError> {
        let config: ScenarioConfig = serde_yaml::from_str(contents)
            .map_err(|e| ScenarioError::ParseError(Path::new("<inline>").to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// 組み込みのデモシナリオ
    pub fn demo() -> Self {
        Self {
            meta: ScenarioMeta {
                version: "1.0".to_string(),
                name: "demo".to_string(),
                description: "ランダム配置のレーダー4基と5つのPOIによるデモ".to_string(),
            },
            map: MapConfig {
                boundary: BoundaryConfig {
                    min_lat: 40.30,
                    max_lat: 40.50,
                    min_lon: -3.80,
                    max_lon: -3.55,
                },
                height: 40,
                width: 50,
            },
            sensors: SensorsConfig {
                seed: 42,
                random_count: 4,
                radars: Vec::new(),
            },
            planning: PlanningConfig {
                tolerance: 0.6,
                heuristic: "h1".to_string(),
                start_index: 0,
                pois: vec![
                    LocationConfig { latitude: 40.31, longitude: -3.79 },
                    LocationConfig { latitude: 40.49, longitude: -3.56 },
                    LocationConfig { latitude: 40.40, longitude: -3.70 },
                    LocationConfig { latitude: 40.45, longitude: -3.62 },
                    LocationConfig { latitude: 40.33, longitude: -3.60 },
                ],
            },
        }
    }

    /// 設定の基本的な検証
    pub fn validate(&self) -> Result<(), ScenarioError> {
        let boundary = &self.map.boundary;
        if boundary.min_lat >= boundary.max_lat || boundary.min_lon >= boundary.max_lon {
            return Err(ScenarioError::ValidationError("Invalid map boundary".to_string()));
        }

        if self.map.height == 0 || self.map.width == 0 {
            return Err(ScenarioError::ValidationError("height and width must be positive".to_string()));
        }

        if !(self.planning.tolerance.is_finite() && self.planning.tolerance > 0.0) {
            return Err(ScenarioError::ValidationError("tolerance must be positive".to_string()));
        }

        if self.sensors.random_count == 0 && self.sensors.radars.is_empty() {
            return Err(ScenarioError::ValidationError(
                "at least one radar or a positive random_count is required".to_string()
            ));
        }

        for radar in &self.sensors.radars {
            radar.validate()?;
        }

        if self.planning.start_index >= self.planning.pois.len() {
            return Err(ScenarioError::ValidationError(
                format!("start_index {} is out of range for {} POIs",
                        self.planning.start_index, self.planning.pois.len())
            ));
        }

        self.planning.heuristic
            .parse::<crate::models::Heuristic>()
            .map_err(ScenarioError::ValidationError)?;

        for poi in &self.planning.pois {
            if !self.boundary().contains(&Location::from(*poi)) {
                return Err(ScenarioError::ValidationError(
                    format!("POI ({}, {}) outside map boundary", poi.latitude, poi.longitude)
                ));
            }
        }

        Ok(())
    }

    /// 地図の境界
    pub fn boundary(&self) -> Boundary {
        Boundary::from(&self.map.boundary)
    }

    /// POIの座標リスト
    pub fn pois(&self) -> Vec<Location> {
        self.planning.pois.iter().map(|&poi| poi.into()).collect()
    }

    /// シナリオの概要を表示
    pub fn print_summary(&self) {
        println!("=== シナリオ情報 ===");
        println!("名前: {}", self.meta.name);
        println!("説明: {}", self.meta.description);
        println!("バージョン: {}", self.meta.version);
        println!();

        println!("=== 地図設定 ===");
        let b = &self.map.boundary;
        println!("緯度: {:.4} 〜 {:.4}", b.min_lat, b.max_lat);
        println!("経度: {:.4} 〜 {:.4}", b.min_lon, b.max_lon);
        println!("グリッド: {} × {} セル", self.map.height, self.map.width);
        println!();

        println!("=== センサー ===");
        println!("指定レーダー: {}基", self.sensors.radars.len());
        println!("ランダム配置: {}基 (シード値: {})", self.sensors.random_count, self.sensors.seed);
        println!();

        println!("=== 経路計画 ===");
        println!("許容値: {:.4}", self.planning.tolerance);
        println!("ヒューリスティック: {}", self.planning.heuristic);
        println!("POI数: {} (開始: {})", self.planning.pois.len(), self.planning.start_index);
        for (i, poi) in self.planning.pois.iter().enumerate() {
            println!("  POI {}: ({:.5}, {:.5})", i, poi.latitude, poi.longitude);
        }
    }
}

/// シナリオ読み込みエラー
#[derive(Debug)]
pub enum ScenarioError {
    FileNotFound(std::path::PathBuf),
    IoError(std::path::PathBuf, std::io::Error),
    ParseError(std::path::PathBuf, serde_yaml::Error),
    ValidationError(String),
}

impl std::fmt::Display for ScenarioError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScenarioError::FileNotFound(path) => {
                write!(f, "シナリオファイルが見つかりません: {}", path.display())
            }
            ScenarioError::IoError(path, err) => {
                write!(f, "ファイル読み込みエラー {}: {}", path.display(), err)
            }
            ScenarioError::ParseError(path, err) => {
                write!(f, "YAML解析エラー {}: {}", path.display(), err)
            }
            ScenarioError::ValidationError(msg) => {
                write!(f, "設定検証エラー: {}", msg)
            }
        }
    }
}

impl std::error::Error for ScenarioError {}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
meta:
  version: "1.0"
  name: sample
  description: explicit radar
map:
  boundary: { min_lat: 0.0, max_lat: 4.0, min_lon: 0.0, max_lon: 4.0 }
  height: 5
  width: 5
sensors:
  seed: 1
  radars:
    - id: R001
      location: { latitude: 2.0, longitude: 2.0 }
      transmission_power_w: 1000.0
      antenna_gain: 20.0
      wavelength_m: 0.1
      cross_section_m2: 1.0
      minimum_signal_w: 1.0e-13
      total_loss: 2.0
planning:
  tolerance: 0.5
  heuristic: h2
  start_index: 0
  pois:
    - { latitude: 0.0, longitude: 0.0 }
    - { latitude: 4.0, longitude: 4.0 }
"#;

    #[test]
    fn test_parse_sample_scenario() {
        let config = ScenarioConfig::from_yaml_str(SAMPLE).expect("有効なシナリオ");
        assert_eq!(config.map.height, 5);
        assert_eq!(config.sensors.random_count, 0);
        assert_eq!(config.sensors.radars.len(), 1);
        assert_eq!(config.pois()[1], Location::new(4.0, 4.0));

        let radar = Radar::from(&config.sensors.radars[0]);
        assert_eq!(radar.id, "R001");
        assert_eq!(radar.total_loss, 2.0);
    }

    #[test]
    fn test_demo_is_valid() {
        assert!(ScenarioConfig::demo().validate().is_ok());
    }

    #[test]
    fn test_validation_errors() {
        let mut config = ScenarioConfig::demo();
        config.planning.start_index = 10;
        assert!(matches!(config.validate(), Err(ScenarioError::ValidationError(_))));

        let mut config = ScenarioConfig::demo();
        config.map.boundary.max_lat = config.map.boundary.min_lat;
        assert!(config.validate().is_err());

        let mut config = ScenarioConfig::demo();
        config.sensors.random_count = 0;
        assert!(config.validate().is_err());

        let mut config = ScenarioConfig::demo();
        config.planning.heuristic = "dijkstra".to_string();
        assert!(config.validate().is_err());

        let mut config = ScenarioConfig::demo();
        config.planning.pois.push(LocationConfig { latitude: 0.0, longitude: 0.0 });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bundled_scenario_file() {
        let config = ScenarioConfig::from_file("scenarios/corridor.yaml").expect("同梱シナリオ");
        assert_eq!(config.meta.name, "corridor");
        assert_eq!(config.sensors.radars.len(), 2);
        assert_eq!(config.sensors.random_count, 2);
        assert_eq!(config.pois().len(), 3);
    }

    #[test]
    fn test_invalid_radar_parameters() {
        for (key, bad) in [
            ("minimum_signal_w: 1.0e-13", "minimum_signal_w: 0.0"),
            ("transmission_power_w: 1000.0", "transmission_power_w: -5.0"),
            ("total_loss: 2.0", "total_loss: .inf"),
            ("wavelength_m: 0.1", "wavelength_m: .nan"),
        ] {
            let yaml = SAMPLE.replace(key, bad);
            let result = ScenarioConfig::from_yaml_str(&yaml);
            assert!(matches!(result, Err(ScenarioError::ValidationError(_))), "{} は拒否されるべき", bad);
        }
    }

    #[test]
    fn test_missing_file() {
        let result = ScenarioConfig::from_file("does/not/exist.yaml");
        assert!(matches!(result, Err(ScenarioError::FileNotFound(_))));
    }
}
