use criterion::{black_box, criterion_group, criterion_main, Criterion};
use issuelens_core::{flatten, FileEntry, FileNode, FileTree, KeySection};

fn synthetic_tree(depth: usize, fan_out: usize) -> FileTree {
    let mut level = FileTree::new();
    for i in 0..fan_out {
        level.insert(
            format!("file_{:03}.rs", i),
            FileNode::File(FileEntry {
                reason: Some(format!("touches handler {i}")),
                relevance_score: None,
                key_sections: vec![KeySection {
                    line_start: 1,
                    line_end: 20,
                    code: "fn handler() {}".to_string(),
                    explanation: "handler body".to_string(),
                }],
            }),
        );
        if depth > 0 {
            level.insert(
                format!("module_{:03}", i),
                FileNode::directory(synthetic_tree(depth - 1, fan_out)),
            );
        }
    }
    level
}

fn bench_flatten(c: &mut Criterion) {
    let tree = synthetic_tree(3, 8);
    c.bench_function("flatten_relevant_files_depth3_fan8", |b| {
        b.iter(|| flatten(black_box(&tree)))
    });
}

criterion_group!(benches, bench_flatten);
criterion_main!(benches);
