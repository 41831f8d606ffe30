use super::*;

#[test]
fn scissor_contains_rect_is_max_exclusive() {
    let scissor = Scissor::new(32, 32, 128, 96);
    assert!(scissor.contains_rect(32, 32, 96, 64));
    assert!(scissor.contains_rect(64, 48, 32, 16));
    assert!(!scissor.contains_rect(32, 32, 97, 64));
    assert!(!scissor.contains_rect(31, 32, 32, 32));
    assert!(!scissor.contains_rect(64, 80, 32, 32));
}

#[test]
fn scissor_expand_covers_both_rects() {
    let mut scissor = Scissor::new(100, 100, 200, 200);
    scissor.expand_to_include(&Scissor::new(50, 150, 120, 300));
    assert_eq!(scissor, Scissor::new(50, 100, 200, 300));
}

#[test]
fn framebuffer_enabled_kinds_tracks_nonzero_cpp() {
    let mut fb = FramebufferDescriptor::new(640, 480);
    assert!(!fb.has_attachments());
    assert_eq!(fb.enabled_kinds(), BufferKinds::empty());

    fb.color_cpp[0] = 4;
    fb.depth_cpp = 3;
    fb.stencil_cpp = 1;
    assert!(fb.has_attachments());
    assert_eq!(
        fb.enabled_kinds(),
        BufferKinds::COLOR | BufferKinds::DEPTH | BufferKinds::STENCIL
    );
}

#[test]
fn budget_validate_accepts_sane_values() {
    GmemBudget {
        total_bytes: 256 * 1024,
        align_w: 32,
        align_h: 32,
        max_bin_width: 512,
        max_pipes: 8,
    }
    .validate();
}

#[test]
#[should_panic(expected = "power of two")]
fn budget_validate_rejects_unaligned_bins() {
    GmemBudget {
        total_bytes: 256 * 1024,
        align_w: 24,
        align_h: 32,
        max_bin_width: 512,
        max_pipes: 8,
    }
    .validate();
}

#[test]
fn class_budgets_validate_for_every_bin_width_cap() {
    for max_bin_width in [
        GmemBudget::MAX_BIN_WIDTH_LEGACY,
        GmemBudget::MAX_BIN_WIDTH_BINNING,
        GmemBudget::MAX_BIN_WIDTH_WIDE,
    ] {
        let budget = GmemBudget::for_class(256 * 1024, max_bin_width);
        budget.validate();
        assert_eq!(budget.align_w, 32);
        assert_eq!(budget.max_pipes, 8);
    }
}

#[test]
fn generation_presets_match_hardware_policies() {
    let fixed = GenerationCaps::fixed_grid();
    assert_eq!(
        fixed.pipe_policy,
        PipePolicy::FixedGrid {
            tiles_x: 6,
            tiles_y: 6
        }
    );
    assert_eq!(fixed.sequencing, TileSequencing::PackedRowCol);

    let adaptive = GenerationCaps::adaptive();
    assert_eq!(adaptive.pipe_policy, PipePolicy::Adaptive);
    assert_eq!(adaptive.sequencing, TileSequencing::PerPipeCounter);
}
