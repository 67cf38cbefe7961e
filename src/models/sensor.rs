use rand::Rng;
use tracing::debug;

use crate::models::{
    common::{math_utils, GridSpec, Location, METERS_PER_DEGREE},
    errors::PlanningError,
    traits::ISensor,
};

/// レーダー方程式で距離を扱う際の最小距離（メートル）
///
/// センサー直上のセルで検知レベルが無限大にならないようにする。
const MIN_RANGE_M: f64 = 1.0;

/// レーダーセンサー
///
/// 地図上の固定位置に設置され、レーダー方程式に基づいて
/// 任意の座標での検知レベル（受信電力と最小検出信号の比）を返します。
#[derive(Debug, Clone, PartialEq)]
pub struct Radar {
    /// センサーの一意識別子
    pub id: String,
    /// 設置位置
    pub location: Location,
    /// 送信電力（W）
    pub transmission_power: f64,
    /// アンテナ利得
    pub antenna_gain: f64,
    /// 波長（m）
    pub wavelength: f64,
    /// レーダー反射断面積（m²）
    pub cross_section: f64,
    /// 最小検出信号（W）
    pub minimum_signal: f64,
    /// システム損失
    pub total_loss: f64,
}

/// レーダーパラメータの乱数生成範囲
pub struct RadarParameterRanges;

impl RadarParameterRanges {
    pub const TRANSMISSION_POWER: (f64, f64) = (1.0, 1_000_000.0);
    pub const ANTENNA_GAIN: (f64, f64) = (10.0, 50.0);
    pub const WAVELENGTH: (f64, f64) = (0.001, 10.0);
    pub const CROSS_SECTION: (f64, f64) = (0.1, 10.0);
    pub const MINIMUM_SIGNAL: (f64, f64) = (1e-15, 1e-10);
    pub const TOTAL_LOSS: (u32, u32) = (1, 10); // 上限は含まない
}

impl Radar {
    /// 新しいレーダーを作成します
    ///
    /// # 引数
    ///
    /// * `id` - センサーの一意識別子
    /// * `location` - 設置位置
    ///
    /// # 戻り値
    ///
    /// 各パラメータが1.0のレーダー（`with_*` メソッドで設定する）
    pub fn new(id: String, location: Location) -> Self {
        Self {
            id,
            location,
            transmission_power: 1.0,
            antenna_gain: 1.0,
            wavelength: 1.0,
            cross_section: 1.0,
            minimum_signal: 1.0,
            total_loss: 1.0,
        }
    }

    pub fn with_transmission_power(mut self, watts: f64) -> Self {
        self.transmission_power = watts;
        self
    }

    pub fn with_antenna_gain(mut self, gain: f64) -> Self {
        self.antenna_gain = gain;
        self
    }

    pub fn with_wavelength(mut self, meters: f64) -> Self {
        self.wavelength = meters;
        self
    }

    pub fn with_cross_section(mut self, square_meters: f64) -> Self {
        self.cross_section = square_meters;
        self
    }

    pub fn with_minimum_signal(mut self, watts: f64) -> Self {
        self.minimum_signal = watts;
        self
    }

    pub fn with_total_loss(mut self, loss: f64) -> Self {
        self.total_loss = loss;
        self
    }

    /// ランダムなパラメータでレーダーを作成
    ///
    /// 各パラメータは `RadarParameterRanges` の範囲から一様に選ばれる。
    pub fn random<R: Rng + ?Sized>(id: String, location: Location, rng: &mut R) -> Self {
        let (p_lo, p_hi) = RadarParameterRanges::TRANSMISSION_POWER;
        let (g_lo, g_hi) = RadarParameterRanges::ANTENNA_GAIN;
        let (w_lo, w_hi) = RadarParameterRanges::WAVELENGTH;
        let (s_lo, s_hi) = RadarParameterRanges::CROSS_SECTION;
        let (m_lo, m_hi) = RadarParameterRanges::MINIMUM_SIGNAL;
        let (l_lo, l_hi) = RadarParameterRanges::TOTAL_LOSS;

        Self::new(id, location)
            .with_transmission_power(rng.random_range(p_lo..p_hi))
            .with_antenna_gain(rng.random_range(g_lo..g_hi))
            .with_wavelength(rng.random_range(w_lo..w_hi))
            .with_cross_section(rng.random_range(s_lo..s_hi))
            .with_minimum_signal(rng.random_range(m_lo..m_hi))
            .with_total_loss(rng.random_range(l_lo..l_hi) as f64)
    }

    /// 指定座標までの距離（メートル、最小距離でクランプ）
    pub fn range_to(&self, location: &Location) -> f64 {
        (self.location.distance(location) * METERS_PER_DEGREE).max(MIN_RANGE_M)
    }

    /// レーダー方程式による受信電力（W）
    ///
    /// Pr = Pt·G²·λ²·σ / ((4π)³·R⁴·L)
    pub fn received_power(&self, location: &Location) -> f64 {
        let range = self.range_to(location);
        let numerator = self.transmission_power
            * self.antenna_gain.powi(2)
            * self.wavelength.powi(2)
            * self.cross_section;
        let denominator = (4.0 * std::f64::consts::PI).powi(3) * range.powi(4) * self.total_loss;
        numerator / denominator
    }
}

impl ISensor for Radar {
    fn detection_level(&self, location: &Location) -> f64 {
        (self.received_power(location) / self.minimum_signal).max(0.0)
    }

    fn get_id(&self) -> String {
        self.id.clone()
    }

    fn get_location(&self) -> Location {
        self.location
    }
}

/// センサーをランダムに配置します
///
/// 緯度方向 `height` 点・経度方向 `width` 点の等間隔候補位置から、
/// 各軸独立に重複なしで `count` 個の値を選び、i 番目の緯度と i 番目の
/// 経度を組にして配置します。パラメータは一様乱数で決まります。
///
/// # 引数
///
/// * `grid` - 候補位置を決めるグリッド
/// * `count` - 配置するセンサー数
/// * `rng` - 乱数生成器（再現性が必要な場合はシード付きのものを渡す）
///
/// # 戻り値
///
/// 生成されたレーダーのベクター。`count` がどちらかの軸の候補数を
/// 超える場合は `PlanningError::Sampling`
pub fn generate_sensors<R: Rng + ?Sized>(
    grid: &GridSpec,
    count: usize,
    rng: &mut R,
) -> Result<Vec<Radar>, PlanningError> {
    let available = grid.height.min(grid.width);
    if count > available {
        return Err(PlanningError::Sampling { requested: count, available });
    }

    let boundary = &grid.boundary;
    let lat_candidates = math_utils::linspace(boundary.min_lat, boundary.max_lat, grid.height);
    let lon_candidates = math_utils::linspace(boundary.min_lon, boundary.max_lon, grid.width);

    let lat_indices = rand::seq::index::sample(&mut *rng, lat_candidates.len(), count);
    let lon_indices = rand::seq::index::sample(&mut *rng, lon_candidates.len(), count);

    let radars: Vec<Radar> = lat_indices
        .iter()
        .zip(lon_indices.iter())
        .enumerate()
        .map(|(i, (lat_idx, lon_idx))| {
            let location = Location::new(lat_candidates[lat_idx], lon_candidates[lon_idx]);
            let radar = Radar::random(format!("R{:03}", i + 1), location, &mut *rng);
            debug!(
                "レーダー {} を配置: (lat, lon) = ({:.5}, {:.5})",
                radar.id, location.latitude, location.longitude
            );
            radar
        })
        .collect();

    Ok(radars)
}
