//! 依赖图构建和拓扑排序
//!
//! 分析 Pass 之间的资源依赖关系，构建 DAG 并进行拓扑排序。
//! 资源按 `(种类, 名字)` 区分，依赖推导规则由 `RgWriterPolicy` 决定。

use std::collections::{HashMap, VecDeque};

use crate::config::RgWriterPolicy;
use crate::render_graph::pass::RgPassNode;
use crate::render_graph::resource_handle::RgResourceKind;

type ResourceKey<'a> = (RgResourceKind, &'a str);

/// 依赖边：从 producer 到 consumer
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DependencyEdge {
    /// 先执行的 Pass 下标
    pub producer: usize,
    /// 后执行的 Pass 下标
    pub consumer: usize,
    /// 产生这条边的资源
    pub resource: String,
}

/// 依赖图
pub struct DependencyGraph {
    pass_count: usize,
    /// 邻接表（出边）：producer -> [consumer]
    adjacency: Vec<Vec<usize>>,
    /// 入度表（去重后的前驱数量）
    in_degrees: Vec<usize>,
    edges: Vec<DependencyEdge>,
}

impl DependencyGraph {
    /// 创建新的依赖图
    pub fn new(pass_count: usize) -> Self {
        Self {
            pass_count,
            adjacency: vec![Vec::new(); pass_count],
            in_degrees: vec![0; pass_count],
            edges: Vec::new(),
        }
    }

    /// 添加依赖边，producer 先于 consumer 执行
    ///
    /// 自环会被忽略；同一对 pass 之间只计一次入度。
    pub fn add_edge(&mut self, producer: usize, consumer: usize, resource: &str) {
        if producer == consumer {
            return;
        }

        // 避免重复边
        if !self.adjacency[producer].contains(&consumer) {
            self.adjacency[producer].push(consumer);
            self.in_degrees[consumer] += 1;
        }

        self.edges.push(DependencyEdge {
            producer,
            consumer,
            resource: resource.to_string(),
        });
    }

    /// Kahn 拓扑排序
    ///
    /// 入度为 0 的 pass 按下标顺序入队，因此无依赖的 pass 保持声明顺序。
    ///
    /// # 返回
    /// - `Ok(order)`: 拓扑排序后的 Pass 下标
    /// - `Err((sorted, remaining))`: 检测到循环依赖，`sorted` 为已排好的部分，`remaining` 为剩下的 pass
    pub fn topological_sort(&self) -> Result<Vec<usize>, (Vec<usize>, Vec<usize>)> {
        let mut in_degrees = self.in_degrees.clone();
        let mut queue: VecDeque<usize> = (0..self.pass_count).filter(|&i| in_degrees[i] == 0).collect();
        let mut result = Vec::with_capacity(self.pass_count);

        while let Some(node) = queue.pop_front() {
            result.push(node);

            for &neighbor in &self.adjacency[node] {
                in_degrees[neighbor] -= 1;
                if in_degrees[neighbor] == 0 {
                    queue.push_back(neighbor);
                }
            }
        }

        if result.len() != self.pass_count {
            let remaining: Vec<usize> = (0..self.pass_count).filter(|&i| in_degrees[i] > 0).collect();
            Err((result, remaining))
        } else {
            Ok(result)
        }
    }

    /// Pass 的直接前驱
    pub fn get_predecessors(&self, pass_index: usize) -> Vec<usize> {
        self.adjacency
            .iter()
            .enumerate()
            .filter(|(_, adj)| adj.contains(&pass_index))
            .map(|(i, _)| i)
            .collect()
    }

    /// Pass 的直接后继
    pub fn get_successors(&self, pass_index: usize) -> &[usize] {
        &self.adjacency[pass_index]
    }

    /// 是否存在 producer -> consumer 的直接依赖
    pub fn has_edge(&self, producer: usize, consumer: usize) -> bool {
        self.adjacency.get(producer).is_some_and(|adj| adj.contains(&consumer))
    }

    /// 获取所有边
    pub fn edges(&self) -> &[DependencyEdge] {
        &self.edges
    }

    #[inline]
    pub fn pass_count(&self) -> usize {
        self.pass_count
    }
}

/// 依赖分析器
///
/// 从 Pass 的读写声明构建依赖图。
pub struct DependencyAnalyzer;

impl DependencyAnalyzer {
    pub fn analyze(passes: &[RgPassNode], policy: RgWriterPolicy) -> DependencyGraph {
        match policy {
            RgWriterPolicy::NearestPriorWriter => Self::analyze_nearest_prior(passes),
            RgWriterPolicy::GlobalLastWriter => Self::analyze_global_last(passes),
        }
    }

    /// 按声明顺序扫描
    ///
    /// 规则：
    /// - 写后读（RAW）：reader 依赖之前最近的 writer
    /// - 写后写（WAW）：后一个 writer 依赖前一个 writer
    /// - 读后写（WAR）：writer 依赖上一次写入之后的所有 reader
    fn analyze_nearest_prior(passes: &[RgPassNode]) -> DependencyGraph {
        let mut graph = DependencyGraph::new(passes.len());

        // 跟踪每个资源的最后写入者
        let mut last_writer: HashMap<ResourceKey<'_>, usize> = HashMap::new();
        // 跟踪每个资源在最后一次写入后的所有读取者
        let mut readers_since_write: HashMap<ResourceKey<'_>, Vec<usize>> = HashMap::new();

        for (pass_idx, pass) in passes.iter().enumerate() {
            for read in &pass.reads {
                let key = (read.kind, read.name.as_str());
                if let Some(&writer) = last_writer.get(&key) {
                    graph.add_edge(writer, pass_idx, &read.name);
                }
                let readers = readers_since_write.entry(key).or_default();
                if !readers.contains(&pass_idx) {
                    readers.push(pass_idx);
                }
            }

            for write in &pass.writes {
                let key = (write.kind, write.name.as_str());
                if let Some(&prev_writer) = last_writer.get(&key) {
                    graph.add_edge(prev_writer, pass_idx, &write.name);
                }
                if let Some(readers) = readers_since_write.remove(&key) {
                    for reader in readers {
                        graph.add_edge(reader, pass_idx, &write.name);
                    }
                }
                last_writer.insert(key, pass_idx);
            }
        }

        graph
    }

    /// 先扫描所有 pass 建立 writer 表（后写覆盖先写），再为每个 read 连边
    fn analyze_global_last(passes: &[RgPassNode]) -> DependencyGraph {
        let mut graph = DependencyGraph::new(passes.len());

        let mut writer: HashMap<ResourceKey<'_>, usize> = HashMap::new();
        for (pass_idx, pass) in passes.iter().enumerate() {
            for write in &pass.writes {
                writer.insert((write.kind, write.name.as_str()), pass_idx);
            }
        }

        for (pass_idx, pass) in passes.iter().enumerate() {
            for read in &pass.reads {
                if let Some(&w) = writer.get(&(read.kind, read.name.as_str())) {
                    graph.add_edge(w, pass_idx, &read.name);
                }
            }
        }

        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_graph::pass::{RgClosureExecutor, RgPassBuilder, RgQueueType};
    use crate::render_graph::resource_registry::RgResourceRegistry;

    fn make_pass(id: usize, setup: impl FnOnce(&mut RgPassBuilder)) -> RgPassNode {
        let mut registry = RgResourceRegistry::new();
        let mut builder = RgPassBuilder::new(format!("pass-{id}"), RgQueueType::Graphics, &mut registry, 1);
        setup(&mut builder);
        RgPassNode::new(id, builder, Box::new(RgClosureExecutor { callback: Box::new(|_| {}) }))
    }

    #[test]
    fn test_topological_sort_keeps_declaration_order() {
        let mut graph = DependencyGraph::new(4);
        graph.add_edge(2, 1, "x");
        graph.add_edge(2, 1, "y");

        assert_eq!(graph.topological_sort().unwrap(), vec![0, 2, 3, 1]);
        assert_eq!(graph.edges().len(), 2);
        assert_eq!(graph.get_predecessors(1), vec![2]);
    }

    #[test]
    fn test_self_edge_ignored() {
        let mut graph = DependencyGraph::new(1);
        graph.add_edge(0, 0, "accum");
        assert!(graph.edges().is_empty());
        assert_eq!(graph.topological_sort().unwrap(), vec![0]);
    }

    #[test]
    fn test_cycle_detected() {
        let mut graph = DependencyGraph::new(3);
        graph.add_edge(0, 1, "x");
        graph.add_edge(1, 0, "y");

        let (sorted, remaining) = graph.topological_sort().unwrap_err();
        assert_eq!(sorted, vec![2]);
        assert_eq!(remaining, vec![0, 1]);
    }

    #[test]
    fn test_read_depends_on_writer_declared_later() {
        let passes = vec![
            make_pass(0, |b| {
                b.sample_image("albedo");
            }),
            make_pass(1, |b| {
                b.color_attachment("albedo", None);
            }),
        ];

        let global = DependencyAnalyzer::analyze(&passes, RgWriterPolicy::GlobalLastWriter);
        assert_eq!(global.topological_sort().unwrap(), vec![1, 0]);

        // 最近的前驱 writer 不存在时，读的是上一帧的内容，同时写入方需要等读取完成
        let nearest = DependencyAnalyzer::analyze(&passes, RgWriterPolicy::NearestPriorWriter);
        assert!(nearest.has_edge(0, 1));
        assert_eq!(nearest.topological_sort().unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_same_name_different_kind_independent() {
        let passes = vec![
            make_pass(0, |b| {
                b.color_attachment("data", None);
            }),
            make_pass(1, |b| {
                b.read_uniform_buffer("data");
            }),
        ];

        let graph = DependencyAnalyzer::analyze(&passes, RgWriterPolicy::NearestPriorWriter);
        assert!(graph.edges().is_empty());
    }

    #[test]
    fn test_write_after_read_and_write_after_write() {
        // A 写 x，B 读 x，C 写 x
        let passes = vec![
            make_pass(0, |b| {
                b.color_attachment("x", None);
            }),
            make_pass(1, |b| {
                b.sample_image("x");
            }),
            make_pass(2, |b| {
                b.color_attachment("x", None);
            }),
        ];

        let graph = DependencyAnalyzer::analyze(&passes, RgWriterPolicy::NearestPriorWriter);
        assert!(graph.has_edge(0, 1));
        assert!(graph.has_edge(0, 2));
        assert!(graph.has_edge(1, 2));
        assert_eq!(graph.topological_sort().unwrap(), vec![0, 1, 2]);
    }
}
