use tracing::{debug, info, warn};

use crate::models::{
    common::{Boundary, GridCell, GridSpec, Location},
    errors::PlanningError,
    graph::RiskGraph,
    search::{astar_path, SearchContext},
    traits::IHeuristic,
};

/// 経路（POI間の区間ごとのセル列）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Route {
    pub segments: Vec<Vec<GridCell>>,
}

impl Route {
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// 全区間を連結したセル列（区間の継ぎ目の重複は除く）
    pub fn cells(&self) -> Vec<GridCell> {
        let mut cells: Vec<GridCell> = Vec::new();
        for segment in &self.segments {
            for &cell in segment {
                if cells.last() != Some(&cell) {
                    cells.push(cell);
                }
            }
        }
        cells
    }
}

/// 経路計画の結果
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedRoute {
    /// 計画された経路（失敗時は空）
    pub route: Route,
    /// 訪問順に並べたPOI
    pub visiting_order: Vec<Location>,
    /// ヒューリスティック評価回数（累積、近似値）
    pub heuristic_calls: u64,
    /// 展開ノード数（累積）
    pub nodes_expanded: u64,
}

impl PlannedRoute {
    /// 実行可能な経路が見つからなかったか
    pub fn is_empty(&self) -> bool {
        self.route.is_empty()
    }
}

/// POIの訪問順を決定します
///
/// 開始POIからのマンハッタン距離（地理座標空間）で全POIを安定ソートします。
/// 基準点は開始POIに固定で、訪問ごとに更新はしません（巡回路の最適化ではない）。
///
/// # 戻り値
///
/// 訪問順に並べたPOI。`start_index` が範囲外の場合は None
pub fn order_pois(pois: &[Location], start_index: usize) -> Option<Vec<Location>> {
    let origin = *pois.get(start_index)?;
    let mut ordered = pois.to_vec();
    ordered.sort_by(|a, b| a.manhattan_distance(&origin).total_cmp(&b.manhattan_distance(&origin)));
    Some(ordered)
}

/// 地理座標を最も近いグリッドセルに変換します
///
/// 検知マップ生成と同じ線形離散化（`GridSpec`）を使うため、
/// 変換結果のセルは検知マップのセルと一致します。
pub fn to_grid_coordinates(poi: &Location, boundary: &Boundary, width: usize, height: usize) -> Option<GridCell> {
    GridSpec::new(*boundary, height, width).to_cell(poi)
}

/// 複数POIを巡る経路を計画します
///
/// POIの訪問順を決めて各POIをセルに離散化し、連続する2セル間ごとに
/// A* を実行して区間を連結します。いずれかの区間で失敗した場合
/// （経路なし・端点がノードでない）は、それまでの区間も破棄して
/// 空の経路を返し、残りの区間は探索しません。
///
/// # 引数
///
/// * `graph` - 検知リスクグラフ
/// * `heuristic` - 探索に使うヒューリスティック
/// * `pois` - 訪問するPOI
/// * `start_index` - 開始POIのインデックス
/// * `boundary` - 地図の境界
/// * `width` - 経度方向のセル数
/// * `height` - 緯度方向のセル数
/// * `context` - 探索コンテキスト（カウンタは呼び出しをまたいで累積）
///
/// # 戻り値
///
/// 計画結果（経路とカウンタの累積値）
#[allow(clippy::too_many_arguments)]
pub fn plan_route<H: IHeuristic + ?Sized>(
    graph: &RiskGraph,
    heuristic: &H,
    pois: &[Location],
    start_index: usize,
    boundary: &Boundary,
    width: usize,
    height: usize,
    context: &mut SearchContext,
) -> PlannedRoute {
    let Some(visiting_order) = order_pois(pois, start_index) else {
        warn!("開始POIのインデックス {} が範囲外です (POI数: {})", start_index, pois.len());
        return finish(Route::default(), Vec::new(), context);
    };

    let cells: Vec<Option<GridCell>> = visiting_order
        .iter()
        .map(|poi| to_grid_coordinates(poi, boundary, width, height))
        .collect();
    debug!("訪問順のセル: {:?}", cells);

    match plan_segments(graph, heuristic, &visiting_order, &cells, context) {
        Ok(route) => {
            info!("経路計画完了: {}区間", route.segment_count());
            finish(route, visiting_order, context)
        }
        Err(e) => {
            warn!("経路計画を中止しました: {}", e);
            finish(Route::default(), visiting_order, context)
        }
    }
}

fn plan_segments<H: IHeuristic + ?Sized>(
    graph: &RiskGraph,
    heuristic: &H,
    visiting_order: &[Location],
    cells: &[Option<GridCell>],
    context: &mut SearchContext,
) -> Result<Route, PlanningError> {
    let mut route = Route::default();

    if let Some(start) = excluded_start(graph, cells) {
        warn!("開始地点 {} は検知確率が許容値以上のためグラフに含まれていません", start);
    }

    for (i, pair) in cells.windows(2).enumerate() {
        let from = resolve_cell(pair[0], &visiting_order[i])?;
        let to = resolve_cell(pair[1], &visiting_order[i + 1])?;

        let segment = astar_path(graph, heuristic, context, from, to)?;
        debug!("区間 {}: {} -> {} ({}セル)", i, from, to, segment.len());
        route.segments.push(segment);
    }

    Ok(route)
}

/// 訪問順の先頭セルがグリッド内にあるのにグラフのノードでない場合、そのセル
fn excluded_start(graph: &RiskGraph, cells: &[Option<GridCell>]) -> Option<GridCell> {
    let start = (*cells.first()?)?;
    (!graph.contains_node(start)).then_some(start)
}

fn resolve_cell(cell: Option<GridCell>, poi: &Location) -> Result<GridCell, PlanningError> {
    cell.ok_or(PlanningError::OutsideGrid {
        latitude: poi.latitude,
        longitude: poi.longitude,
    })
}

fn finish(route: Route, visiting_order: Vec<Location>, context: &SearchContext) -> PlannedRoute {
    PlannedRoute {
        route,
        visiting_order,
        heuristic_calls: context.heuristic_calls,
        nodes_expanded: context.nodes_expanded,
    }
}

/// 経路の総コストを計算します
///
/// 各区間の連続するセル対について、対応するエッジの重みを合計します。
/// 探索内部のコストとは独立に再計算する監査用の関数です。
///
/// # 戻り値
///
/// 総コスト。グラフに存在しないエッジを含む場合は `PlanningError::EdgeNotFound`
pub fn compute_route_cost(graph: &RiskGraph, route: &Route) -> Result<f64, PlanningError> {
    let mut cost = 0.0;

    for segment in &route.segments {
        for step in segment.windows(2) {
            let (from, to) = (step[0], step[1]);
            cost += graph
                .edge_weight(from, to)
                .ok_or(PlanningError::EdgeNotFound { from, to })?;
        }
    }

    Ok(cost)
}
