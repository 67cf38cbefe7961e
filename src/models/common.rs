use std::fmt;

/// 検知確率の下限値
///
/// 正規化後のセルがコスト0にならないように全セルをこの値以上に保つ。
pub const EPSILON: f64 = 1e-4;

/// 緯度・経度1度あたりの距離（メートル、平面近似）
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// 地理座標（度）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub latitude: f64,  // deg
    pub longitude: f64, // deg
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// 座標空間でのマンハッタン距離（度）
    pub fn manhattan_distance(&self, other: &Location) -> f64 {
        (self.latitude - other.latitude).abs() + (self.longitude - other.longitude).abs()
    }

    /// 座標空間でのユークリッド距離（度）
    pub fn distance(&self, other: &Location) -> f64 {
        ((self.latitude - other.latitude).powi(2) + (self.longitude - other.longitude).powi(2)).sqrt()
    }
}

/// 地図の境界（緯度・経度の最小/最大）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boundary {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl Boundary {
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        Self { min_lat, max_lat, min_lon, max_lon }
    }

    /// 座標が境界内かどうかを判定
    pub fn contains(&self, location: &Location) -> bool {
        location.latitude >= self.min_lat && location.latitude <= self.max_lat &&
        location.longitude >= self.min_lon && location.longitude <= self.max_lon
    }
}

/// グリッド上のセル座標（行 = 緯度方向、列 = 経度方向）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCell {
    pub row: usize,
    pub col: usize,
}

impl GridCell {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// セル間のマンハッタン距離（ステップ数）
    pub fn manhattan_distance(&self, other: &GridCell) -> f64 {
        self.row.abs_diff(other.row) as f64 + self.col.abs_diff(other.col) as f64
    }

    /// セル間のユークリッド距離
    pub fn euclidean_distance(&self, other: &GridCell) -> f64 {
        let dr = self.row.abs_diff(other.row) as f64;
        let dc = self.col.abs_diff(other.col) as f64;
        (dr * dr + dc * dc).sqrt()
    }
}

impl fmt::Display for GridCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// 境界を height×width のグリッドに離散化する線形マッピング
///
/// 検知マップの生成、センサー候補位置、POIの離散化はすべてこの
/// マッピングを経由するため、セルと座標の対応が一致する。
/// 各軸は最小値から最大値まで両端を含む等間隔で刻まれる。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    pub boundary: Boundary,
    pub height: usize, // 緯度方向のセル数
    pub width: usize,  // 経度方向のセル数
}

impl GridSpec {
    pub fn new(boundary: Boundary, height: usize, width: usize) -> Self {
        Self { boundary, height, width }
    }

    /// 緯度方向の1セルあたりの増分（度）
    pub fn lat_step(&self) -> f64 {
        math_utils::step(self.boundary.min_lat, self.boundary.max_lat, self.height)
    }

    /// 経度方向の1セルあたりの増分（度）
    pub fn lon_step(&self) -> f64 {
        math_utils::step(self.boundary.min_lon, self.boundary.max_lon, self.width)
    }

    /// セルの中心座標を取得
    pub fn cell_location(&self, cell: GridCell) -> Location {
        Location::new(
            self.boundary.min_lat + cell.row as f64 * self.lat_step(),
            self.boundary.min_lon + cell.col as f64 * self.lon_step(),
        )
    }

    /// 座標を最も近いセルに変換
    ///
    /// # 引数
    ///
    /// * `location` - 変換する地理座標
    ///
    /// # 戻り値
    ///
    /// 最も近いセル。丸めた結果がグリッド外になる場合は None
    pub fn to_cell(&self, location: &Location) -> Option<GridCell> {
        let b = &self.boundary;
        let row = math_utils::nearest_index(location.latitude, b.min_lat, b.max_lat, self.height)?;
        let col = math_utils::nearest_index(location.longitude, b.min_lon, b.max_lon, self.width)?;
        Some(GridCell::new(row, col))
    }

    /// 4近傍（上・下・左・右）のうちグリッド内のセルを列挙
    pub fn neighbors(&self, cell: GridCell) -> impl Iterator<Item = GridCell> + '_ {
        const OFFSETS: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

        OFFSETS.iter().filter_map(move |&(dr, dc)| {
            let row = cell.row.checked_add_signed(dr)?;
            let col = cell.col.checked_add_signed(dc)?;
            (row < self.height && col < self.width).then(|| GridCell::new(row, col))
        })
    }

    /// 総セル数
    pub fn cell_count(&self) -> usize {
        self.height * self.width
    }
}

/// 数学ユーティリティ関数
pub mod math_utils {
    /// 両端を含む等間隔の刻み幅を計算（1点の場合は0）
    pub fn step(start: f64, stop: f64, num: usize) -> f64 {
        if num > 1 {
            (stop - start) / (num - 1) as f64
        } else {
            0.0
        }
    }

    /// start から stop までの num 点の等間隔列
    pub fn linspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
        let step = step(start, stop, num);
        (0..num).map(|i| start + i as f64 * step).collect()
    }

    /// `linspace(start, stop, num)` の中で値に最も近い点のインデックス
    ///
    /// 丸めた結果が `0..num` に収まらない場合は None。
    /// 1点しかない軸では `start..=stop` の範囲内の値だけがその点に対応する。
    pub fn nearest_index(value: f64, start: f64, stop: f64, num: usize) -> Option<usize> {
        match num {
            0 => None,
            1 => {
                let (lo, hi) = if start <= stop { (start, stop) } else { (stop, start) };
                (lo..=hi).contains(&value).then_some(0)
            }
            _ => {
                let index = ((value - start) / step(start, stop, num)).round();
                if index.is_finite() && index >= 0.0 && index < num as f64 {
                    Some(index as usize)
                } else {
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_grid() -> GridSpec {
        GridSpec::new(Boundary::new(0.0, 4.0, 0.0, 4.0), 5, 5)
    }

    #[test]
    fn test_linspace_includes_both_ends() {
        let values = math_utils::linspace(10.0, 12.0, 5);
        assert_eq!(values, vec![10.0, 10.5, 11.0, 11.5, 12.0]);
        assert_eq!(math_utils::linspace(3.0, 7.0, 1), vec![3.0]);
    }

    #[test]
    fn test_cell_location_round_trip() {
        let grid = GridSpec::new(Boundary::new(40.0, 41.0, -4.0, -3.0), 7, 9);
        for row in 0..grid.height {
            for col in 0..grid.width {
                let cell = GridCell::new(row, col);
                assert_eq!(grid.to_cell(&grid.cell_location(cell)), Some(cell));
            }
        }
    }

    #[test]
    fn test_to_cell_rounds_to_nearest() {
        let grid = unit_grid();
        assert_eq!(grid.to_cell(&Location::new(1.4, 2.6)), Some(GridCell::new(1, 3)));
        assert_eq!(grid.to_cell(&Location::new(4.2, 0.0)), Some(GridCell::new(4, 0)));
    }

    #[test]
    fn test_to_cell_outside_grid() {
        let grid = unit_grid();
        assert_eq!(grid.to_cell(&Location::new(-1.0, 2.0)), None);
        assert_eq!(grid.to_cell(&Location::new(2.0, 4.6)), None);
    }

    #[test]
    fn test_to_cell_single_cell_axis() {
        let grid = GridSpec::new(Boundary::new(0.0, 2.0, 0.0, 2.0), 1, 3);
        assert_eq!(grid.to_cell(&Location::new(0.0, 1.0)), Some(GridCell::new(0, 1)));
        assert_eq!(grid.to_cell(&Location::new(2.0, 2.0)), Some(GridCell::new(0, 2)));
        assert_eq!(grid.to_cell(&Location::new(500.0, 1.0)), None);
        assert_eq!(grid.to_cell(&Location::new(-0.1, 1.0)), None);
        assert_eq!(math_utils::nearest_index(f64::NAN, 0.0, 2.0, 3), None);
    }

    #[test]
    fn test_neighbors_respect_bounds() {
        let grid = unit_grid();
        let corner: Vec<GridCell> = grid.neighbors(GridCell::new(0, 0)).collect();
        assert_eq!(corner, vec![GridCell::new(1, 0), GridCell::new(0, 1)]);

        let center: Vec<GridCell> = grid.neighbors(GridCell::new(2, 2)).collect();
        assert_eq!(
            center,
            vec![GridCell::new(1, 2), GridCell::new(3, 2), GridCell::new(2, 1), GridCell::new(2, 3)]
        );
    }

    #[test]
    fn test_cell_distances() {
        let a = GridCell::new(0, 0);
        let b = GridCell::new(3, 4);
        assert_eq!(a.manhattan_distance(&b), 7.0);
        assert_eq!(a.euclidean_distance(&b), 5.0);
        assert_eq!(b.manhattan_distance(&b), 0.0);
    }
}
