/// Packer validation tool
/// Tests: in-process → worker pool → rayon batch on random inputs, without a host app
use gridpack::{
    fill_layouts, LayoutFlags, LayoutId, LayoutJob, LayoutOptions, LayoutResult, PackedLayout,
    Packer, PackerConfig, PackerProcessor,
};
use std::cell::RefCell;
use std::rc::Rc;

const CONTAINER: f32 = 640.0;

/// xorshift64*, enough for reproducible inputs
struct Rng(u64);

impl Rng {
    fn next_u32(&mut self) -> u32 {
        self.0 ^= self.0 >> 12;
        self.0 ^= self.0 << 25;
        self.0 ^= self.0 >> 27;
        (self.0.wrapping_mul(0x2545_F491_4F6C_DD1D) >> 32) as u32
    }

    fn size(&mut self) -> f32 {
        // Quarter-pixel steps keep some sizes fractional
        (8 + self.next_u32() % 160) as f32 + (self.next_u32() % 4) as f32 * 0.25
    }
}

fn flags_for(case: usize) -> LayoutFlags {
    LayoutFlags::from_bits_truncate(case as u32 % 32)
}

fn container(flags: LayoutFlags) -> (f32, f32) {
    if flags.contains(LayoutFlags::HORIZONTAL) {
        (0.0, CONTAINER)
    } else {
        (CONTAINER, 0.0)
    }
}

fn check_layout(items: &[(f32, f32)], layout: &PackedLayout, flags: LayoutFlags) -> Vec<String> {
    let mut problems = Vec::new();
    let horizontal = flags.contains(LayoutFlags::HORIZONTAL);
    let items: Vec<(f32, f32)> = if flags.contains(LayoutFlags::ROUNDING) {
        items.iter().map(|(w, h)| (w.round(), h.round())).collect()
    } else {
        items.to_vec()
    };

    for (i, ((w, h), slot)) in items.iter().zip(&layout.slots).enumerate() {
        if !slot.left.is_finite() || !slot.top.is_finite() || slot.left < -0.001 || slot.top < -0.001 {
            problems.push(format!("item {} has slot ({}, {})", i, slot.left, slot.top));
        }
        let fixed_overrun = if horizontal {
            slot.top + h - layout.height
        } else {
            slot.left + w - layout.width
        };
        // Items larger than the fixed side overrun by design; only flag others
        let oversized = if horizontal { *h > layout.height } else { *w > layout.width };
        if fixed_overrun > 1.0 && !oversized {
            problems.push(format!("item {} crosses the fixed edge by {:.2}", i, fixed_overrun));
        }
    }

    let boxes: Vec<_> = items
        .iter()
        .zip(&layout.slots)
        .map(|((w, h), s)| (s.left, s.top, *w, *h))
        .collect();
    for (i, a) in boxes.iter().enumerate() {
        for (j, b) in boxes.iter().enumerate().skip(i + 1) {
            let separated = a.0 + a.2 <= b.0 + 0.001
                || b.0 + b.2 <= a.0 + 0.001
                || a.1 + a.3 <= b.1 + 0.001
                || b.1 + b.3 <= a.1 + 0.001;
            if !separated {
                problems.push(format!("items {} and {} overlap", i, j));
            }
        }
    }

    if !flags.intersects(LayoutFlags::ROUNDING | LayoutFlags::ALIGN_RIGHT | LayoutFlags::ALIGN_BOTTOM) {
        let extent = boxes
            .iter()
            .map(|b| if horizontal { b.0 + b.2 } else { b.1 + b.3 })
            .fold(0.0f32, f32::max);
        let grown = if horizontal { layout.width } else { layout.height };
        if (extent - grown).abs() > 0.001 {
            problems.push(format!("grown side {} but items reach {}", grown, extent));
        }
    }

    problems
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("gridpack=info".parse().unwrap()),
        )
        .init();

    let cases: usize = match std::env::args().nth(1) {
        Some(raw) => raw.parse()?,
        None => 64,
    };

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║              GRIDPACK PACKER VALIDATION TOOL                 ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    println!("Cases: {}", cases);
    println!();

    let mut rng = Rng(0x9E37_79B9_7F4A_7C15);
    let inputs: Vec<(LayoutFlags, Vec<(f32, f32)>)> = (0..cases)
        .map(|case| {
            let count = 1 + rng.next_u32() as usize % 120;
            let items = (0..count).map(|_| (rng.size(), rng.size())).collect();
            (flags_for(case), items)
        })
        .collect();

    // === STAGE 1: IN-PROCESS ===
    println!("┌─ STAGE 1: IN-PROCESS PACKING ──────────────────────────────┐");
    let start = std::time::Instant::now();
    let mut processor = PackerProcessor::new();
    let reference: Vec<PackedLayout> = inputs
        .iter()
        .map(|(flags, items)| {
            let (w, h) = container(*flags);
            processor.fill_layout(items, w, h, *flags)
        })
        .collect();
    println!("  ✓ {} layouts in {:.2}ms", reference.len(), start.elapsed().as_secs_f64() * 1000.0);

    let mut failures = 0;
    for (case, ((flags, items), layout)) in inputs.iter().zip(&reference).enumerate() {
        for problem in check_layout(items, layout, *flags) {
            if failures < 10 {
                println!("  ✗ case {} ({:?}): {}", case, flags, problem);
            }
            failures += 1;
        }
    }
    if failures == 0 {
        println!("  ✓ No overlaps, edges respected, grown side tight");
    }
    println!("└────────────────────────────────────────────────────────────┘");
    println!();

    // === STAGE 2: WORKER POOL ===
    println!("┌─ STAGE 2: WORKER POOL ─────────────────────────────────────┐");
    let results: Rc<RefCell<Vec<LayoutResult>>> = Rc::new(RefCell::new(Vec::new()));
    let mut packer = Packer::new(&PackerConfig {
        workers: 4,
        options: LayoutOptions::default(),
    })?;
    let start = std::time::Instant::now();
    for (case, (flags, items)) in inputs.iter().enumerate() {
        packer.set_options(LayoutOptions::from(*flags).into());
        let (w, h) = container(*flags);
        let sink = results.clone();
        packer.create_layout(LayoutId(case as u32 + 1), items, w, h, move |layout| {
            sink.borrow_mut().push(layout);
        })?;
    }
    packer.wait()?;
    packer.destroy();
    println!("  ✓ {} layouts in {:.2}ms", results.borrow().len(), start.elapsed().as_secs_f64() * 1000.0);

    let mut mismatches = 0;
    for layout in results.borrow().iter() {
        let expected = &reference[layout.id.0 as usize - 1];
        if layout.width != expected.width || layout.height != expected.height || layout.slots != expected.slots {
            if mismatches < 10 {
                println!("  ✗ layout {} differs from the in-process result", layout.id);
            }
            mismatches += 1;
        }
    }
    if results.borrow().len() != cases {
        println!("  ✗ {} of {} callbacks fired", results.borrow().len(), cases);
        mismatches += 1;
    }
    if mismatches == 0 {
        println!("  ✓ Bit-identical to in-process results");
    }
    failures += mismatches;
    println!("└────────────────────────────────────────────────────────────┘");
    println!();

    // === STAGE 3: RAYON BATCH ===
    println!("┌─ STAGE 3: RAYON BATCH ─────────────────────────────────────┐");
    let jobs: Vec<LayoutJob<(f32, f32)>> = inputs
        .iter()
        .map(|(flags, items)| LayoutJob::new(items.clone(), CONTAINER, CONTAINER, *flags))
        .collect();
    let start = std::time::Instant::now();
    let batch = fill_layouts(&jobs);
    println!("  ✓ {} layouts in {:.2}ms", batch.len(), start.elapsed().as_secs_f64() * 1000.0);
    let differing = batch.iter().zip(&reference).filter(|(a, b)| a != b).count();
    if differing == 0 {
        println!("  ✓ Bit-identical to in-process results");
    } else {
        println!("  ✗ {} layouts differ", differing);
    }
    failures += differing;
    println!("└────────────────────────────────────────────────────────────┘");
    println!();

    if failures == 0 {
        println!("✓ ALL CHECKS PASSED");
        Ok(())
    } else {
        anyhow::bail!("{} checks failed", failures)
    }
}
