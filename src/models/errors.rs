use crate::models::common::GridCell;

/// 検知マップ生成・経路計画のエラー
#[derive(Debug, Clone, PartialEq)]
pub enum PlanningError {
    /// 要求されたセンサー数が候補位置の数を超えている
    Sampling { requested: usize, available: usize },
    /// センサーが1つもない
    EmptyInput,
    /// 2点間に経路が存在しない
    NoPath { from: GridCell, to: GridCell },
    /// ノードがグラフに存在しない
    NodeNotFound(GridCell),
    /// POIがグリッド外に離散化された（グラフのノードになり得ない）
    OutsideGrid { latitude: f64, longitude: f64 },
    /// 経路が参照するエッジがグラフに存在しない
    EdgeNotFound { from: GridCell, to: GridCell },
}

impl std::fmt::Display for PlanningError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlanningError::Sampling { requested, available } => {
                write!(f, "センサー配置のサンプリングエラー: {}基要求されましたが候補位置は{}点です", requested, available)
            }
            PlanningError::EmptyInput => {
                write!(f, "センサーが指定されていないため検知マップを計算できません")
            }
            PlanningError::NoPath { from, to } => {
                write!(f, "経路が見つかりません: {} -> {}", from, to)
            }
            PlanningError::NodeNotFound(cell) => {
                write!(f, "ノードがグラフに存在しません: {}", cell)
            }
            PlanningError::OutsideGrid { latitude, longitude } => {
                write!(f, "POIがグリッド外です: ({:.5}, {:.5})", latitude, longitude)
            }
            PlanningError::EdgeNotFound { from, to } => {
                write!(f, "エッジがグラフに存在しません: {} -> {}", from, to)
            }
        }
    }
}

impl std::error::Error for PlanningError {}
