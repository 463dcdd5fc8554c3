use std::cell::RefCell;
use std::rc::Rc;

use gridpack::{
    CancelOutcome, Item, LayoutError, LayoutFlags, LayoutId, LayoutOptions, LayoutResult, Margins,
    PackItem, PackedLayout, Packer, PackerConfig, PackerProcessor, PartialOptions, Slot,
};

type Results = Rc<RefCell<Vec<LayoutResult>>>;

fn recorder(results: &Results) -> impl FnOnce(LayoutResult) + 'static {
    let sink = results.clone();
    move |layout| sink.borrow_mut().push(layout)
}

fn pool(workers: usize, options: LayoutOptions) -> Packer {
    Packer::new(&PackerConfig { workers, options }).unwrap()
}

fn slots(pairs: &[(f32, f32)]) -> Vec<Slot> {
    pairs.iter().map(|&(left, top)| Slot { left, top }).collect()
}

/// Deterministic pseudo-random item lists.
struct Lcg(u32);

impl Lcg {
    fn next(&mut self) -> u32 {
        self.0 = self.0.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        self.0 >> 8
    }

    fn items(&mut self, count: usize) -> Vec<(f32, f32)> {
        (0..count)
            .map(|_| {
                let w = 4.0 + (self.next() % 90) as f32 + (self.next() % 2) as f32 * 0.5;
                let h = 4.0 + (self.next() % 90) as f32;
                (w, h)
            })
            .collect()
    }
}

fn boxes(items: &[(f32, f32)], layout: &PackedLayout) -> Vec<(f32, f32, f32, f32)> {
    items
        .iter()
        .zip(&layout.slots)
        .map(|(&(w, h), s)| (s.left, s.top, w, h))
        .collect()
}

fn assert_no_overlap(boxes: &[(f32, f32, f32, f32)]) {
    for (i, a) in boxes.iter().enumerate() {
        for (j, b) in boxes.iter().enumerate().skip(i + 1) {
            let separated = a.0 + a.2 <= b.0 + 0.001
                || b.0 + b.2 <= a.0 + 0.001
                || a.1 + a.3 <= b.1 + 0.001
                || b.1 + b.3 <= a.1 + 0.001;
            assert!(separated, "items {i} and {j} overlap: {a:?} {b:?}");
        }
    }
}

#[test]
fn vertical_shelf_fills_one_row() {
    let mut packer = Packer::in_process(LayoutOptions::default());
    let results = Results::default();
    packer
        .create_layout(LayoutId(1), &[(100.0, 100.0); 3], 300.0, 0.0, recorder(&results))
        .unwrap();

    let results = results.borrow();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].width, 300.0);
    assert_eq!(results[0].height, 100.0);
    assert_eq!(results[0].slots, slots(&[(0.0, 0.0), (100.0, 0.0), (200.0, 0.0)]));
}

#[test]
fn fill_gaps_reuses_space_left_behind() {
    let items = [(100.0, 100.0), (200.0, 100.0), (100.0, 100.0)];
    let mut processor = PackerProcessor::new();

    let filled = processor.fill_layout(&items, 200.0, 0.0, LayoutFlags::FILL_GAPS);
    assert_eq!(filled.slots, slots(&[(0.0, 0.0), (0.0, 100.0), (100.0, 0.0)]));
    assert_eq!(filled.height, 200.0);

    let stacked = processor.fill_layout(&items, 200.0, 0.0, LayoutFlags::empty());
    assert_eq!(stacked.slots[2], Slot { left: 0.0, top: 200.0 });
    assert_eq!(stacked.height, 300.0);
}

#[test]
fn fill_gaps_still_discards_fragments_past_the_container() {
    // The fourth item cannot reuse the strip under the right-hand column:
    // that fragment starts at the container edge and is dropped even when
    // filling gaps, so the item opens a new row instead.
    let items = [(100.0, 200.0), (100.0, 100.0), (100.0, 100.0), (100.0, 100.0)];
    let layout = PackerProcessor::new().fill_layout(&items, 200.0, 0.0, LayoutFlags::FILL_GAPS);
    assert_eq!(
        layout.slots,
        slots(&[(0.0, 0.0), (100.0, 0.0), (100.0, 100.0), (0.0, 200.0)])
    );
    assert_eq!(layout.height, 300.0);
}

#[test]
fn cancelled_request_never_calls_back() {
    let mut packer = pool(1, LayoutOptions::default());
    let first = Results::default();
    let second = Results::default();

    packer
        .create_layout(LayoutId(1), &[(50.0, 50.0); 20], 200.0, 0.0, recorder(&first))
        .unwrap()
        .expect("pooled request returns a handle");
    let handle = packer
        .create_layout(LayoutId(2), &[(50.0, 50.0); 20], 200.0, 0.0, recorder(&second))
        .unwrap()
        .expect("pooled request returns a handle");
    assert_eq!(packer.queued_count(), 1);

    assert_eq!(handle.cancel(&mut packer), CancelOutcome::Dequeued);
    assert_eq!(packer.queued_count(), 0);

    assert_eq!(packer.wait().unwrap(), 1);
    assert_eq!(packer.poll().unwrap(), 0);
    assert_eq!(first.borrow().len(), 1);
    assert_eq!(first.borrow()[0].id, LayoutId(1));
    assert!(second.borrow().is_empty());
    assert_eq!(packer.pending_count(), 0);
}

#[test]
fn running_request_can_be_detached() {
    let mut packer = pool(1, LayoutOptions::default());
    let results = Results::default();
    packer
        .create_layout(LayoutId(5), &[(10.0, 10.0); 4], 100.0, 0.0, recorder(&results))
        .unwrap();

    assert_eq!(packer.cancel_layout(LayoutId(5)), CancelOutcome::Detached);
    assert_eq!(packer.cancel_layout(LayoutId(5)), CancelOutcome::Unknown);

    // The worker still holds the id until its reply is consumed
    assert!(matches!(
        packer.create_layout(LayoutId(5), &[(1.0, 1.0)], 10.0, 0.0, |_| {}),
        Err(LayoutError::DuplicateId(LayoutId(5)))
    ));

    assert_eq!(packer.wait().unwrap(), 0);
    assert!(results.borrow().is_empty());
    assert!(!packer.is_in_flight(LayoutId(5)));

    packer
        .create_layout(LayoutId(5), &[(10.0, 10.0)], 100.0, 0.0, recorder(&results))
        .unwrap();
    packer.wait().unwrap();
    assert_eq!(results.borrow().len(), 1);
}

#[test]
fn duplicate_id_is_rejected_without_disturbing_the_first() {
    let mut packer = pool(1, LayoutOptions::default());
    let results = Results::default();
    let items = [(30.0, 40.0); 6];

    packer
        .create_layout(LayoutId(9), &items, 90.0, 0.0, recorder(&results))
        .unwrap();
    let err = packer
        .create_layout(LayoutId(9), &items, 90.0, 0.0, recorder(&results))
        .unwrap_err();
    assert!(matches!(err, LayoutError::DuplicateId(LayoutId(9))));
    assert!(err.to_string().contains("#9"));

    packer.wait().unwrap();
    let results = results.borrow();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].height, 80.0);
}

#[test]
fn pool_matches_in_process_bit_for_bit() {
    let mut rng = Lcg(7);
    let cases: Vec<(LayoutFlags, Vec<(f32, f32)>)> = (0..24)
        .map(|case| (LayoutFlags::from_bits_truncate(case % 32), rng.items(1 + case as usize * 3)))
        .collect();

    let mut packer = pool(3, LayoutOptions::default());
    let results = Results::default();
    for (n, (flags, items)) in cases.iter().enumerate() {
        packer.set_options(LayoutOptions::from(*flags).into());
        packer
            .create_layout(LayoutId(n as u32 + 1), items, 300.0, 300.0, recorder(&results))
            .unwrap();
    }
    packer.wait().unwrap();

    let results = results.borrow();
    assert_eq!(results.len(), cases.len());
    let mut processor = PackerProcessor::new();
    for result in results.iter() {
        let (flags, items) = &cases[result.id.0 as usize - 1];
        let (w, h) = if flags.contains(LayoutFlags::HORIZONTAL) { (0.0, 300.0) } else { (300.0, 0.0) };
        let expected = processor.fill_layout(items, w, h, *flags);
        assert_eq!(result.width.to_bits(), expected.width.to_bits());
        assert_eq!(result.height.to_bits(), expected.height.to_bits());
        assert_eq!(result.slots, expected.slots);
    }
}

#[test]
fn random_layouts_are_disjoint_and_tight() {
    let mut rng = Lcg(1234);
    let mut processor = PackerProcessor::new();
    for round in 0..40 {
        let items = rng.items(5 + round * 2);
        for flags in [
            LayoutFlags::empty(),
            LayoutFlags::FILL_GAPS,
            LayoutFlags::HORIZONTAL,
            LayoutFlags::HORIZONTAL | LayoutFlags::FILL_GAPS,
        ] {
            let horizontal = flags.contains(LayoutFlags::HORIZONTAL);
            let (w, h) = if horizontal { (0.0, 250.0) } else { (250.0, 0.0) };
            let layout = processor.fill_layout(&items, w, h, flags);
            let placed = boxes(&items, &layout);
            assert_no_overlap(&placed);

            let extent = placed
                .iter()
                .map(|b| if horizontal { b.0 + b.2 } else { b.1 + b.3 })
                .fold(0.0f32, f32::max);
            let grown = if horizontal { layout.width } else { layout.height };
            assert_eq!(grown, extent, "round {round} {flags:?}");

            for b in &placed {
                if horizontal {
                    assert!(b.1 + b.3 <= 250.0 + 0.001);
                } else {
                    assert!(b.0 + b.2 <= 250.0 + 0.001);
                }
            }
        }
    }
}

#[test]
fn repeated_calls_are_deterministic() {
    let items = Lcg(99).items(60);
    let mut processor = PackerProcessor::new();
    let first = processor.fill_layout(&items, 400.0, 0.0, LayoutFlags::FILL_GAPS);
    let second = processor.fill_layout(&items, 400.0, 0.0, LayoutFlags::FILL_GAPS);
    let fresh = PackerProcessor::new().fill_layout(&items, 400.0, 0.0, LayoutFlags::FILL_GAPS);
    assert_eq!(first, second);
    assert_eq!(first, fresh);
}

#[test]
fn rounding_yields_integers() {
    let items = Lcg(5).items(40);
    let mut processor = PackerProcessor::new();
    for flags in [LayoutFlags::ROUNDING, LayoutFlags::ROUNDING | LayoutFlags::HORIZONTAL | LayoutFlags::FILL_GAPS] {
        let layout = processor.fill_layout(&items, 333.4, 333.4, flags);
        assert_eq!(layout.width.fract(), 0.0);
        assert_eq!(layout.height.fract(), 0.0);
        for slot in &layout.slots {
            assert_eq!(slot.left.fract(), 0.0);
            assert_eq!(slot.top.fract(), 0.0);
        }
    }

    let plain = processor.fill_layout(&[(10.5, 10.5), (10.5, 10.5)], 100.0, 0.0, LayoutFlags::empty());
    assert_eq!(plain.slots[1].left, 10.5);
    assert_eq!(plain.height, 10.5);
}

#[test]
fn alignment_mirrors_positions() {
    let items = Lcg(42).items(30);
    let mut processor = PackerProcessor::new();

    let base = processor.fill_layout(&items, 300.0, 0.0, LayoutFlags::FILL_GAPS);
    let right = processor.fill_layout(&items, 300.0, 0.0, LayoutFlags::FILL_GAPS | LayoutFlags::ALIGN_RIGHT);
    assert_eq!(right.width, base.width);
    assert_eq!(right.height, base.height);
    for ((plain, mirrored), (w, _)) in base.slots.iter().zip(&right.slots).zip(&items) {
        assert_eq!(mirrored.left, right.width - (plain.left + w));
        assert_eq!(mirrored.top, plain.top);
    }

    let bottom = processor.fill_layout(&items, 300.0, 0.0, LayoutFlags::FILL_GAPS | LayoutFlags::ALIGN_BOTTOM);
    for ((plain, mirrored), (_, h)) in base.slots.iter().zip(&bottom.slots).zip(&items) {
        assert_eq!(mirrored.top, bottom.height - (plain.top + h));
        assert_eq!(mirrored.left, plain.left);
    }
}

#[test]
fn margins_take_up_space() {
    let items = [
        Item::new(80.0, 30.0).with_margins(Margins::uniform(10.0)),
        Item::new(100.0, 50.0),
    ];
    assert_eq!(items[0].outer_size(), (100.0, 50.0));

    let mut packer = Packer::in_process(LayoutOptions::default());
    let results = Results::default();
    packer
        .create_layout(LayoutId(1), &items, 200.0, 0.0, recorder(&results))
        .unwrap();
    let results = results.borrow();
    assert_eq!(results[0].slots, slots(&[(0.0, 0.0), (100.0, 0.0)]));
    assert_eq!(results[0].height, 50.0);
}

#[test]
fn empty_request_resolves_synchronously_on_a_pool() {
    let mut packer = pool(2, LayoutOptions::default());
    let results = Results::default();
    let none: [(f32, f32); 0] = [];
    let handle = packer
        .create_layout(LayoutId(3), &none, 500.0, 500.0, recorder(&results))
        .unwrap();
    assert!(handle.is_none());
    let results = results.borrow();
    assert_eq!(results.len(), 1);
    assert_eq!((results[0].width, results[0].height), (500.0, 0.0));
    assert!(results[0].slots.is_empty());
}

#[test]
fn options_apply_to_later_requests_only() {
    let mut packer = pool(1, LayoutOptions::default());
    let results = Results::default();
    packer
        .create_layout(LayoutId(1), &[(50.0, 50.0); 3], 0.0, 100.0, recorder(&results))
        .unwrap();
    packer.set_options(PartialOptions {
        horizontal: Some(true),
        ..Default::default()
    });
    packer
        .create_layout(LayoutId(2), &[(50.0, 50.0); 3], 0.0, 100.0, recorder(&results))
        .unwrap();
    packer.wait().unwrap();

    let results = results.borrow();
    let by_id = |id| results.iter().find(|r| r.id == LayoutId(id)).unwrap();
    // Vertical with a zero width stacks every item in one column
    assert_eq!(by_id(1).height, 150.0);
    // Horizontal with a fixed height of 100 fits two items per column
    assert_eq!(by_id(2).width, 100.0);
    assert_eq!(by_id(2).height, 100.0);
    assert_eq!(by_id(2).slots[2], Slot { left: 50.0, top: 0.0 });
}

#[test]
fn destroy_drops_pending_and_falls_back_to_in_process() {
    let mut packer = pool(1, LayoutOptions::default());
    let results = Results::default();
    packer
        .create_layout(LayoutId(1), &[(10.0, 10.0); 8], 40.0, 0.0, recorder(&results))
        .unwrap();
    packer
        .create_layout(LayoutId(2), &[(10.0, 10.0); 8], 40.0, 0.0, recorder(&results))
        .unwrap();

    packer.destroy();
    assert_eq!(packer.worker_count(), 0);
    assert_eq!(packer.pending_count(), 0);
    assert_eq!(packer.wait().unwrap(), 0);

    let handle = packer
        .create_layout(LayoutId(3), &[(10.0, 10.0); 8], 40.0, 0.0, recorder(&results))
        .unwrap();
    assert!(handle.is_none());
    let results = results.borrow();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, LayoutId(3));
    assert_eq!(results[0].height, 20.0);
}
