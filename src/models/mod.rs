// 基本的なデータ型と数学ユーティリティ
pub mod common;

// センサー・ヒューリスティックのインターフェース（trait）定義
pub mod traits;

// エラー型
pub mod errors;

// 検知マップ・グラフ・探索・経路計画の実装
pub mod sensor;
pub mod detection_field;
pub mod graph;
pub mod search;
pub mod route;

// 便利な re-export
pub use common::*;
pub use traits::*;
pub use errors::PlanningError;
pub use sensor::{Radar, generate_sensors};
pub use detection_field::{DetectionField, compute_detection_field};
pub use graph::{Edge, RiskGraph, build_graph};
pub use search::{Heuristic, SearchContext, astar_path, h1, h2};
pub use route::{PlannedRoute, Route, compute_route_cost, order_pois, plan_route, to_grid_coordinates};
