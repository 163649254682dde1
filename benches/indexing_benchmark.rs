/// Benchmarks for project configuration, queries and task claims
use chunkyard::config::{Config, TaskBackend};
use chunkyard::tasks::{MemoryTaskQueue, NewTask, SqliteTaskQueue, TaskQueue};
use chunkyard::{ChunkType, ChunkyardClient, ConfigureProjectRequest, ListFilesRequest};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::runtime::Runtime;

/// Helper to create a mixed project with `count` files of each kind
fn create_test_files(dir: &TempDir, count: usize) -> anyhow::Result<()> {
    let src_dir = dir.path().join("src");
    let docs_dir = dir.path().join("docs");
    std::fs::create_dir_all(&src_dir)?;
    std::fs::create_dir_all(&docs_dir)?;

    for i in 0..count {
        let rust = format!(
            r#"
pub fn function_{i}(x: i32) -> i32 {{
    x * {}
}}

pub struct Data{i} {{
    pub value: i32,
}}

impl Data{i} {{
    pub fn process(&self) -> i32 {{
        self.value * 2
    }}
}}
"#,
            i + 1
        );
        std::fs::write(src_dir.join(format!("module_{}.rs", i)), rust)?;

        let python = format!(
            "import os\n\nLIMIT = {i}\n\nclass Handler{i}:\n    def run(self):\n        return os.getcwd()\n\ndef helper_{i}():\n    return LIMIT\n"
        );
        std::fs::write(src_dir.join(format!("handler_{}.py", i)), python)?;

        let markdown = format!("# Topic {i}\nDetails.\n\n## Setup\nSteps.\n\n## Usage\nMore.\n");
        std::fs::write(docs_dir.join(format!("topic_{}.md", i)), markdown)?;
    }

    Ok(())
}

fn memory_client() -> ChunkyardClient {
    let mut config = Config::default();
    config.tasks.backend = TaskBackend::Memory;
    ChunkyardClient::with_parts(config, Arc::new(MemoryTaskQueue::new()))
}

fn benchmark_configure(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("configure");

    for file_count in [10, 50, 100].iter() {
        let dir = TempDir::new().unwrap();
        create_test_files(&dir, *file_count).unwrap();
        let client = memory_client();

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_files", file_count * 3)),
            file_count,
            |b, _| {
                b.iter(|| {
                    rt.block_on(async {
                        let response = client
                            .configure_project(ConfigureProjectRequest {
                                root_path: dir.path().to_string_lossy().to_string(),
                                project_id: None,
                            })
                            .await
                            .unwrap();
                        black_box(response.chunk_count)
                    })
                });
            },
        );
    }

    group.finish();
}

fn benchmark_query(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let dir = TempDir::new().unwrap();
    create_test_files(&dir, 100).unwrap();
    let client = memory_client();
    let project_id = rt
        .block_on(client.configure_project(ConfigureProjectRequest {
            root_path: dir.path().to_string_lossy().to_string(),
            project_id: None,
        }))
        .unwrap()
        .project_id;

    let mut group = c.benchmark_group("query");
    let cases: [(&str, Option<ChunkType>, Vec<String>); 3] = [
        ("all_files", None, vec![]),
        ("callables", Some(ChunkType::Callable), vec![]),
        (
            "callables_with_text",
            Some(ChunkType::Callable),
            vec!["process".to_string(), "getcwd".to_string()],
        ),
    ];

    for (label, chunk_type, text) in cases {
        group.bench_function(label, |b| {
            b.iter(|| {
                rt.block_on(async {
                    let response = client
                        .list_files_by_chunk_type_and_contents(ListFilesRequest {
                            project_id: project_id.clone(),
                            chunk_type,
                            text_filter: text.clone(),
                            filter_on: Default::default(),
                        })
                        .await
                        .unwrap();
                    black_box(response.files.len())
                })
            });
        });
    }

    group.finish();
}

fn benchmark_claim(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let dir = TempDir::new().unwrap();
    let queue = rt
        .block_on(SqliteTaskQueue::open(
            dir.path().join("tasks.sqlite"),
            Duration::from_secs(5),
            4,
        ))
        .unwrap();

    c.bench_function("sqlite_add_and_claim", |b| {
        b.iter(|| {
            rt.block_on(async {
                queue.add(NewTask::new("bench task")).await.unwrap();
                black_box(queue.claim_next().await.unwrap())
            })
        });
    });
}

criterion_group!(benches, benchmark_configure, benchmark_query, benchmark_claim);
criterion_main!(benches);
