use crate::models::common::{GridCell, Location};
use crate::models::search::SearchContext;

/// 検知源（センサー）のインターフェース
///
/// 検知マップの生成はこのトレイトだけに依存する。
/// 具体的な検知モデル（レーダー方程式など）は実装側が持つ。
pub trait ISensor {
    /// 指定座標での検知レベル（非負、正規化前）
    fn detection_level(&self, location: &Location) -> f64;

    /// センサーIDの取得
    fn get_id(&self) -> String;

    /// センサー位置の取得
    fn get_location(&self) -> Location;
}

impl<T: ISensor + ?Sized> ISensor for Box<T> {
    fn detection_level(&self, location: &Location) -> f64 {
        (**self).detection_level(location)
    }

    fn get_id(&self) -> String {
        (**self).get_id()
    }

    fn get_location(&self) -> Location {
        (**self).get_location()
    }
}

/// 探索ヒューリスティックのインターフェース
pub trait IHeuristic {
    /// current から goal までの推定コスト
    ///
    /// 評価ごとに `context` の呼び出しカウンタを加算する。
    fn estimate(&self, context: &mut SearchContext, current: GridCell, goal: GridCell) -> f64;
}
