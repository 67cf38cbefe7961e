//! # Search モジュール
//!
//! 検知リスクグラフ上の最短経路探索（A*）と、その探索に使う
//! ヒューリスティック関数・探索コンテキストを提供します。
//!
//! ## ヒューリスティック
//!
//! - **h1**: セル間のマンハッタン距離 × フィールド最小検知確率
//! - **h2**: セル間のユークリッド距離 × フィールド最小検知確率
//!
//! 全エッジの重みはフィールド最小検知確率以上で、1ステップで
//! マンハッタン距離は高々1しか縮まらないため、どちらも許容的かつ無矛盾です。
//!
//! ## カウンタ
//!
//! `SearchContext::heuristic_calls` はヒューリスティックの評価回数で、
//! 同じノードが再評価されることもあるため展開ノード数の近似値にすぎません。
//! 正確な展開ノード数は `SearchContext::nodes_expanded` で取得できます。

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::str::FromStr;

use crate::models::{
    common::GridCell,
    errors::PlanningError,
    graph::RiskGraph,
    traits::IHeuristic,
};

/// 探索コンテキスト
///
/// 経路計画の呼び出しをまたいで累積するカウンタと、ヒューリスティックの
/// スケール係数を保持します。リセットは呼び出し側が明示的に行います。
#[derive(Debug, Clone, PartialEq)]
pub struct SearchContext {
    /// ヒューリスティックのスケール係数（フィールド最小検知確率）
    pub min_probability: f64,
    /// ヒューリスティック評価回数（近似的な指標）
    pub heuristic_calls: u64,
    /// 探索で実際に展開（クローズ）したノード数
    pub nodes_expanded: u64,
}

impl SearchContext {
    pub fn new(min_probability: f64) -> Self {
        Self {
            min_probability,
            heuristic_calls: 0,
            nodes_expanded: 0,
        }
    }

    /// カウンタをゼロに戻す
    pub fn reset(&mut self) {
        self.heuristic_calls = 0;
        self.nodes_expanded = 0;
    }
}

/// h1: マンハッタン距離ヒューリスティック
pub fn h1(context: &mut SearchContext, current: GridCell, goal: GridCell) -> f64 {
    context.heuristic_calls += 1;
    context.min_probability * current.manhattan_distance(&goal)
}

/// h2: ユークリッド距離ヒューリスティック
pub fn h2(context: &mut SearchContext, current: GridCell, goal: GridCell) -> f64 {
    context.heuristic_calls += 1;
    context.min_probability * current.euclidean_distance(&goal)
}

/// 利用可能なヒューリスティック
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heuristic {
    /// h1
    Manhattan,
    /// h2
    Euclidean,
}

impl IHeuristic for Heuristic {
    fn estimate(&self, context: &mut SearchContext, current: GridCell, goal: GridCell) -> f64 {
        match self {
            Heuristic::Manhattan => h1(context, current, goal),
            Heuristic::Euclidean => h2(context, current, goal),
        }
    }
}

impl FromStr for Heuristic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "h1" | "manhattan" => Ok(Heuristic::Manhattan),
            "h2" | "euclidean" => Ok(Heuristic::Euclidean),
            _ => Err(format!("無効なヒューリスティック: {}. 利用可能: h1, h2", s)),
        }
    }
}

impl std::fmt::Display for Heuristic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Heuristic::Manhattan => write!(f, "h1 (manhattan)"),
            Heuristic::Euclidean => write!(f, "h2 (euclidean)"),
        }
    }
}

/// オープンリストの要素
#[derive(Debug, Clone, Copy)]
struct OpenNode {
    cell: GridCell,
    f_score: f64,
    sequence: u64,
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenNode {}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        // 最小ヒープにするため逆順。f値が同じなら先に積んだものを優先
        other
            .f_score
            .partial_cmp(&self.f_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A* による最短経路探索
///
/// # 引数
///
/// * `graph` - 探索対象のグラフ
/// * `heuristic` - ヒューリスティック
/// * `context` - 探索コンテキスト（カウンタが加算される）
/// * `start` - 開始セル
/// * `goal` - 目標セル
///
/// # 戻り値
///
/// start から goal までのセル列（両端を含む）。
/// 端点がノードでない場合は `NodeNotFound`、到達不能なら `NoPath`
pub fn astar_path<H: IHeuristic + ?Sized>(
    graph: &RiskGraph,
    heuristic: &H,
    context: &mut SearchContext,
    start: GridCell,
    goal: GridCell,
) -> Result<Vec<GridCell>, PlanningError> {
    for endpoint in [start, goal] {
        if !graph.contains_node(endpoint) {
            return Err(PlanningError::NodeNotFound(endpoint));
        }
    }

    let mut open_set = BinaryHeap::new();
    let mut came_from: HashMap<GridCell, GridCell> = HashMap::new();
    let mut g_score: HashMap<GridCell, f64> = HashMap::new();
    let mut closed: HashSet<GridCell> = HashSet::new();
    let mut sequence = 0u64;

    g_score.insert(start, 0.0);
    open_set.push(OpenNode {
        cell: start,
        f_score: heuristic.estimate(context, start, goal),
        sequence,
    });

    while let Some(current) = open_set.pop() {
        if !closed.insert(current.cell) {
            continue;
        }
        context.nodes_expanded += 1;

        if current.cell == goal {
            return Ok(reconstruct_path(&came_from, start, goal));
        }

        let current_g = g_score.get(&current.cell).copied().unwrap_or(f64::INFINITY);

        for edge in graph.edges(current.cell) {
            if closed.contains(&edge.to) {
                continue;
            }

            let tentative_g = current_g + edge.weight;
            if tentative_g < g_score.get(&edge.to).copied().unwrap_or(f64::INFINITY) {
                came_from.insert(edge.to, current.cell);
                g_score.insert(edge.to, tentative_g);

                sequence += 1;
                let f_score = tentative_g + heuristic.estimate(context, edge.to, goal);
                open_set.push(OpenNode {
                    cell: edge.to,
                    f_score,
                    sequence,
                });
            }
        }
    }

    Err(PlanningError::NoPath { from: start, to: goal })
}

fn reconstruct_path(came_from: &HashMap<GridCell, GridCell>, start: GridCell, goal: GridCell) -> Vec<GridCell> {
    let mut path = vec![goal];
    let mut current = goal;

    while current != start {
        match came_from.get(&current) {
            Some(&previous) => {
                path.push(previous);
                current = previous;
            }
            None => break,
        }
    }

    path.reverse();
    path
}
