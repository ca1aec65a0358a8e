//! Types Module Tests
//!
//! Tests for domain types (DutyRatio, DutyBand, BitWidth, ControlSymbol)
//! Run with: cargo test --features std --test types_tests

use duty_link::types::{BitWidth, ControlSymbol, DutyBand, DutyRatio};

// =============================================================================
// DutyRatio Tests
// =============================================================================

#[test]
fn test_duty_ratio_in_range() {
    assert!((DutyRatio::new(0.42).fraction() - 0.42).abs() < f32::EPSILON);
    assert_eq!(DutyRatio::new(0.0), DutyRatio::ZERO);
    assert_eq!(DutyRatio::new(1.0), DutyRatio::FULL);
}

#[test]
fn test_duty_ratio_clamps() {
    assert_eq!(DutyRatio::new(-0.5), DutyRatio::ZERO);
    assert_eq!(DutyRatio::new(1.5), DutyRatio::FULL);
}

#[test]
fn test_duty_ratio_nan_is_zero() {
    assert_eq!(DutyRatio::new(f32::NAN), DutyRatio::ZERO);
}

#[test]
fn test_duty_ratio_percent() {
    assert_eq!(DutyRatio::new(0.5).as_percent(), 50);
    assert_eq!(DutyRatio::FULL.as_percent(), 100);
    assert_eq!(DutyRatio::ZERO.as_percent(), 0);
}

// =============================================================================
// DutyBand Tests
// =============================================================================

#[test]
fn test_band_new_valid() {
    let band = DutyBand::new(0.2, 0.8).unwrap();
    assert!((band.min() - 0.2).abs() < f32::EPSILON);
    assert!((band.max() - 0.8).abs() < f32::EPSILON);
    assert!((band.span() - 0.6).abs() < 1e-6);
}

#[test]
fn test_band_new_invalid() {
    assert!(DutyBand::new(0.5, 0.5).is_none());
    assert!(DutyBand::new(0.8, 0.2).is_none());
    assert!(DutyBand::new(-0.1, 0.5).is_none());
    assert!(DutyBand::new(0.1, 1.1).is_none());
}

#[test]
fn test_band_default_is_wide() {
    assert_eq!(DutyBand::default(), DutyBand::WIDE);
}

#[test]
fn test_band_clamp() {
    let band = DutyBand::WIDE;
    assert!((band.clamp(0.0) - 0.15).abs() < f32::EPSILON);
    assert!((band.clamp(1.0) - 0.75).abs() < f32::EPSILON);
    assert!((band.clamp(0.5) - 0.5).abs() < f32::EPSILON);
}

#[test]
fn test_band_contains_with_margin() {
    let band = DutyBand::WIDE;
    assert!(band.contains_with_margin(0.15, 0.0));
    assert!(!band.contains_with_margin(0.14, 0.0));
    assert!(band.contains_with_margin(0.14, 0.02));
}

#[test]
fn test_split_bands_do_not_overlap() {
    assert!(!DutyBand::SPLIT_HIGH.overlaps(&DutyBand::SPLIT_LOW));
    assert!(DutyBand::WIDE.overlaps(&DutyBand::SPLIT_HIGH));
}

// =============================================================================
// BitWidth Tests
// =============================================================================

#[test]
fn test_bit_width_range() {
    assert!(BitWidth::new(0).is_none());
    assert!(BitWidth::new(9).is_none());
    assert_eq!(BitWidth::new(8), Some(BitWidth::BITS8));
}

#[test]
fn test_bit_width_bins_and_mask() {
    assert_eq!(BitWidth::BITS3.bins(), 8);
    assert_eq!(BitWidth::BITS3.mask(), 0x07);
    assert_eq!(BitWidth::BITS4.mask(), 0x0F);
    assert_eq!(BitWidth::BITS7.mask(), 0x7F);
    assert_eq!(BitWidth::BITS8.bins(), 256);
    assert_eq!(BitWidth::BITS8.mask(), 0xFF);
}

// =============================================================================
// ControlSymbol Tests
// =============================================================================

#[test]
fn test_control_symbol_display() {
    assert_eq!(ControlSymbol::Idle.to_string(), "IDLE");
    assert_eq!(ControlSymbol::Start.to_string(), "START");
    assert_eq!(ControlSymbol::Stop.to_string(), "STOP");
}

#[test]
fn test_control_symbol_all() {
    assert_eq!(ControlSymbol::ALL.len(), 3);
    assert_eq!(ControlSymbol::ALL[0], ControlSymbol::Idle);
}
