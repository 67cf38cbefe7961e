use std::collections::HashMap;
use tracing::{debug, trace};

use crate::models::{
    common::{GridCell, GridSpec},
    detection_field::DetectionField,
};

/// 有向エッジ（重みは移動先セルの検知確率）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    pub to: GridCell,
    pub weight: f64,
}

/// 検知リスクグラフ
///
/// 許容値未満のセルだけをノードとし、4近傍のノード同士を有向エッジで結ぶ。
/// A→B の重みは B の検知確率、B→A の重みは A の検知確率となる（非対称）。
/// 一度追加したノード・エッジは削除も重みの変更もしない。
#[derive(Debug, Clone, Default)]
pub struct RiskGraph {
    adjacency: HashMap<GridCell, Vec<Edge>>,
    edge_count: usize,
    tolerance: f64,
}

impl RiskGraph {
    fn new(tolerance: f64) -> Self {
        Self {
            adjacency: HashMap::new(),
            edge_count: 0,
            tolerance,
        }
    }

    fn add_node(&mut self, cell: GridCell) {
        self.adjacency.entry(cell).or_default();
    }

    fn add_edge(&mut self, from: GridCell, to: GridCell, weight: f64) {
        self.adjacency.entry(from).or_default().push(Edge { to, weight });
        self.edge_count += 1;
    }

    /// ノードが存在するか
    pub fn contains_node(&self, cell: GridCell) -> bool {
        self.adjacency.contains_key(&cell)
    }

    /// ノードの出辺（存在しないノードは空）
    pub fn edges(&self, cell: GridCell) -> &[Edge] {
        self.adjacency.get(&cell).map(Vec::as_slice).unwrap_or(&[])
    }

    /// from → to のエッジ重み
    pub fn edge_weight(&self, from: GridCell, to: GridCell) -> Option<f64> {
        self.edges(from).iter().find(|edge| edge.to == to).map(|edge| edge.weight)
    }

    /// 全ノード（順序は不定）
    #[cfg(test)]
    pub fn nodes(&self) -> impl Iterator<Item = GridCell> + '_ {
        self.adjacency.keys().copied()
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// グラフ構築時の許容値
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }
}

/// 検知確率マップから検知リスクグラフを構築します
///
/// 1パス目で検知確率が `tolerance` 未満のセルをノードとして追加し、
/// 2パス目で各ノードの上下左右の隣接セルのうち許容値未満のものへ
/// 有向エッジを張ります。エッジの重みは移動先セルの検知確率です。
///
/// # 引数
///
/// * `field` - 検知確率マップ
/// * `tolerance` - 通行可能とみなす検知確率の上限（この値自体は含まない）
///
/// # 戻り値
///
/// 検知リスクグラフ（非連結や空の場合もある）
pub fn build_graph(field: &DetectionField, tolerance: f64) -> RiskGraph {
    let grid: &GridSpec = field.grid();
    let mut graph = RiskGraph::new(tolerance);

    for (cell, probability) in field.iter() {
        if probability < tolerance {
            graph.add_node(cell);
        } else {
            trace!("セル {} は許容値超過のため除外 (検知確率 {:.6})", cell, probability);
        }
    }

    for (cell, _) in field.iter() {
        if !graph.contains_node(cell) {
            continue;
        }
        for neighbor in grid.neighbors(cell) {
            let Some(neighbor_probability) = field.value(neighbor) else {
                continue;
            };
            if neighbor_probability < tolerance {
                graph.add_edge(cell, neighbor, neighbor_probability);
            }
        }
    }

    debug!(
        "グラフ構築完了: ノード {} / {}セル, エッジ {} (許容値 {:.4})",
        graph.node_count(),
        grid.cell_count(),
        graph.edge_count(),
        tolerance
    );

    graph
}
