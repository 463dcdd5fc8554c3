/// Diagnostic tool to trace one request through the packer
use anyhow::Context;
use gridpack::{Item, LayoutOptions, LayoutResult, Margins, Packer, PackerConfig};
use serde::Deserialize;
use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

#[derive(Debug, Deserialize)]
#[serde(default)]
struct Request {
    width: f32,
    height: f32,
    workers: usize,
    options: LayoutOptions,
    items: Vec<Item>,
}

impl Default for Request {
    fn default() -> Self {
        Request {
            width: 400.0,
            height: 400.0,
            workers: 1,
            options: LayoutOptions {
                fill_gaps: true,
                ..Default::default()
            },
            items: demo_items(),
        }
    }
}

fn demo_items() -> Vec<Item> {
    [
        (120.0, 80.0),
        (60.0, 60.0),
        (200.0, 40.0),
        (90.0, 120.0),
        (40.0, 40.0),
        (150.0, 70.0),
        (80.0, 30.0),
        (30.0, 90.0),
    ]
    .into_iter()
    .enumerate()
    .map(|(i, (w, h))| {
        let item = Item::new(w, h);
        if i % 3 == 0 {
            item.with_margins(Margins::uniform(5.0))
        } else {
            item
        }
    })
    .collect()
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gridpack=debug".parse().unwrap()),
        )
        .init();

    let request = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str::<Request>(&text)
                .with_context(|| format!("failed to parse {}", path.display()))?
        }
        None => Request::default(),
    };

    println!("=== DIAGNOSTIC: Request → Packer → Slots ===");
    println!(
        "Container: {} x {}, {} items, {} workers",
        request.width,
        request.height,
        request.items.len(),
        request.workers
    );
    println!("Options: {:?}", request.options);

    let config = PackerConfig {
        workers: request.workers,
        options: request.options,
    };
    let mut packer = Packer::new(&config)?;

    let result: Rc<RefCell<Option<LayoutResult>>> = Rc::new(RefCell::new(None));
    let sink = result.clone();
    let start = std::time::Instant::now();
    let id = packer.next_id();
    packer.create_layout(id, &request.items, request.width, request.height, move |layout| {
        *sink.borrow_mut() = Some(layout);
    })?;
    packer.wait()?;
    let elapsed = start.elapsed();
    packer.destroy();

    let Some(layout) = result.borrow_mut().take() else {
        anyhow::bail!("layout {} never completed", id);
    };
    debug_assert_eq!(layout.id, id);

    println!("\n[1] Layout {} finished in {:.3}ms", layout.id, elapsed.as_secs_f64() * 1000.0);
    println!("    Container: {} x {} (grows {:?})", layout.width, layout.height, layout.grow);

    println!("\n[2] Slots:");
    let boxes: Vec<_> = request
        .items
        .iter()
        .zip(&layout.slots)
        .map(|(item, slot)| {
            let (w, h) = gridpack::PackItem::outer_size(item);
            (slot.left, slot.top, w, h)
        })
        .collect();
    for (i, (x, y, w, h)) in boxes.iter().enumerate() {
        println!("    [{}] {:.1}x{:.1} at ({:.1}, {:.1})", i, w, h, x, y);
    }

    println!("\n[3] Checking for anomalies:");
    let mut overlaps = 0;
    for (i, a) in boxes.iter().enumerate() {
        for (j, b) in boxes.iter().enumerate().skip(i + 1) {
            let separated = a.0 + a.2 <= b.0 || b.0 + b.2 <= a.0 || a.1 + a.3 <= b.1 || b.1 + b.3 <= a.1;
            if !separated && a.2 > 0.0 && a.3 > 0.0 && b.2 > 0.0 && b.3 > 0.0 {
                println!("    ✗ Items {} and {} overlap", i, j);
                overlaps += 1;
            }
        }
    }

    let used = boxes.iter().map(|b| b.2 * b.3).sum::<f32>();
    let area = layout.width * layout.height;
    println!("    Item area:      {:.0}", used);
    println!("    Container area: {:.0}", area);
    if area > 0.0 {
        println!("    Coverage: {:.1}%", used / area * 100.0);
    }
    if overlaps == 0 {
        println!("    ✓ No overlapping items");
    }

    Ok(())
}
