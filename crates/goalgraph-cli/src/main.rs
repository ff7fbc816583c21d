use anyhow::{Context, Result, bail};
use clap::Parser;
use goalgraph_core::{GoalId, LayoutDirection, TreeResponse};
use goalgraph_events::MemorySink;
use goalgraph_graph::{effective_progress, resolve_style};
use goalgraph_session::{FetchClient, FrameFlavor, GoalSession, RenderFrame};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a TreeResponse JSON payload
    #[arg(short, long)]
    input: PathBuf,

    /// Viewport width
    #[arg(long, default_value_t = 1280.0)]
    width: f32,

    /// Viewport height
    #[arg(long, default_value_t = 720.0)]
    height: f32,

    /// Lay depth out along the vertical axis instead of the horizontal one
    #[arg(long)]
    vertical: bool,

    /// Goal ids to collapse before rendering
    #[arg(long)]
    collapse: Vec<String>,
}

struct FileFetch {
    path: PathBuf,
}

impl FetchClient for FileFetch {
    fn fetch_tree(&self) -> Result<TreeResponse> {
        let text = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        serde_json::from_str(&text).context("parsing TreeResponse payload")
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let sink = Arc::new(MemorySink::new());
    let direction = if args.vertical {
        LayoutDirection::Vertical
    } else {
        LayoutDirection::Horizontal
    };

    let mut session = GoalSession::new(Arc::new(FileFetch {
        path: args.input.clone(),
    }))
    .with_sink(sink.clone())
    .with_direction(direction)
    .with_viewport_debounce(Duration::ZERO);

    session.set_viewport(args.width, args.height);
    session.flush_viewport();
    session.request_refresh();

    let deadline = Instant::now() + Duration::from_secs(10);
    while !session.poll() {
        if Instant::now() >= deadline {
            bail!("fetch did not complete in time");
        }
        thread::sleep(Duration::from_millis(5));
    }

    for id in &args.collapse {
        session.toggle_collapse(&GoalId::from(id.as_str()));
    }

    let frame = session.render_frame();
    match &frame.flavor {
        FrameFlavor::Empty { message } => println!("{message}"),
        FrameFlavor::Error { message } => bail!("failed to load goals: {message}"),
        FrameFlavor::PreparingLayout => println!("Preparing layout..."),
        FrameFlavor::Ready => print_tree(&session, &frame),
        FrameFlavor::Idle | FrameFlavor::Loading => println!("Still loading..."),
    }

    let anomalies = sink.take();
    if !anomalies.is_empty() {
        println!("\n{} anomalies repaired or dropped:", anomalies.len());
        for (kind, id) in anomalies {
            println!("  {kind}: {id}");
        }
    }

    Ok(())
}

fn print_tree(session: &GoalSession, frame: &RenderFrame) {
    if let Some(stats) = frame.stats {
        println!(
            "Goal tree: {} goals, {} done ({:.0}%), depth {}",
            stats.total_goals,
            stats.completed_goals,
            stats.completion_rate * 100.0,
            stats.max_depth
        );
    }
    if let Some(tree) = session.tree() {
        println!(
            "Effective progress: {:.0}%",
            effective_progress(tree) * 100.0
        );
    }

    println!();
    for node in &frame.nodes {
        let colors = resolve_style(&node.style, node.status);
        let marker = if node.ui.collapsed { "[+]" } else { "   " };
        println!(
            "{}{} [{}] {} {:>3.0}%  @ ({:.0}, {:.0})  fill=#{:02x}{:02x}{:02x}",
            "  ".repeat(node.depth),
            marker,
            node.status,
            node.title,
            node.progress * 100.0,
            node.position.x,
            node.position.y,
            colors.fill.r,
            colors.fill.g,
            colors.fill.b,
        );
    }

    println!("\n{} links:", frame.links.len());
    for link in &frame.links {
        println!(
            "  {} -> {}  ({:.0}, {:.0}) -> ({:.0}, {:.0})",
            link.source_id, link.target_id, link.source.x, link.source.y, link.target.x,
            link.target.y
        );
    }
}
