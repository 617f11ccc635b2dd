//! Tests for the operator algebra: involutions, composition, batching,
//! precision conversion and distribution routing.

use approx::assert_abs_diff_eq;
use faer::Mat;
use opalg::core::traits::{Field, Precision};
use opalg::core::wrappers::DenseField;
use opalg::matrix::{dense_operator, diagonal_operator};
use opalg::operator::LinearOperator;

fn field(values: &[f64]) -> DenseField<f64> {
    DenseField::from_vec(values.to_vec())
}

fn assert_fields_close(a: &DenseField<f64>, b: &DenseField<f64>, eps: f64) {
    assert_eq!(a.len(), b.len());
    for (x, y) in a.as_slice().iter().zip(b.as_slice()) {
        assert_abs_diff_eq!(*x, *y, epsilon = eps);
    }
}

fn asym(values: [[f64; 2]; 2]) -> LinearOperator<DenseField<f64>> {
    dense_operator(Mat::from_fn(2, 2, |i, j| values[i][j]))
}

#[test]
fn adjoint_involution_applies_identically() {
    let a = asym([[1.0, 2.0], [-3.0, 4.0]]);
    let x = field(&[0.5, -1.5]);
    assert_fields_close(&a.adj().adj().call(&x), &a.call(&x), 1e-14);
}

#[test]
fn inverse_involution_applies_identically() {
    let a = diagonal_operator(vec![2.0, 3.0, 5.0]);
    let x = field(&[1.0, -2.0, 4.0]);
    assert_fields_close(&a.inv().inv().call(&x), &a.call(&x), 1e-14);
}

#[test]
fn adjoint_of_product_reverses_factors() {
    let a = asym([[1.0, 2.0], [-3.0, 4.0]]);
    let b = asym([[0.0, -1.0], [2.0, 5.0]]);
    let x = field(&[1.0, 2.0]);
    let lhs = (&a * &b).adj().call(&x);
    let rhs = b.adj().call(&a.adj().call(&x));
    assert_fields_close(&lhs, &rhs, 1e-12);
}

#[test]
fn composition_applies_right_then_left() {
    let a = asym([[1.0, 2.0], [-3.0, 4.0]]);
    let b = asym([[0.0, -1.0], [2.0, 5.0]]);
    let x = field(&[1.0, 2.0]);
    assert_fields_close(&(&a * &b).call(&x), &a.call(&b.call(&x)), 1e-12);
}

#[test]
fn inverse_of_product_reverses_factors() {
    let a = diagonal_operator(vec![2.0, 4.0]);
    let b = diagonal_operator(vec![0.5, 8.0]);
    let x = field(&[3.0, -6.0]);
    let lhs = (&a * &b).inv().call(&x);
    let rhs = b.inv().call(&a.inv().call(&x));
    assert_fields_close(&lhs, &rhs, 1e-12);
}

#[test]
fn batch_matches_looped_single() {
    let single = diagonal_operator(vec![2.0, -1.0, 3.0]);
    let batch: LinearOperator<DenseField<f64>> = LinearOperator::builder()
        .forward_batch(|dst: &mut [DenseField<f64>], src: &[DenseField<f64>]| {
            let diag = [2.0, -1.0, 3.0];
            for (d, s) in dst.iter_mut().zip(src.iter()) {
                for ((y, x), di) in d
                    .as_mut_slice()
                    .iter_mut()
                    .zip(s.as_slice())
                    .zip(diag.iter())
                {
                    *y = di * x;
                }
            }
        })
        .build();
    let srcs: Vec<DenseField<f64>> = (0..4)
        .map(|k| field(&[k as f64, k as f64 + 1.0, -(k as f64)]))
        .collect();
    let batched = batch.call_batch(&srcs);
    for (out, s) in batched.iter().zip(srcs.iter()) {
        assert_fields_close(out, &single.call(s), 1e-14);
    }
    // the single-field operator accepts the batch interface too, looping internally
    let looped = single.call_batch(&srcs);
    for (out, s) in looped.iter().zip(srcs.iter()) {
        assert_fields_close(out, &single.call(s), 1e-14);
    }
}

#[test]
fn grouped_matches_ungrouped() {
    let op = diagonal_operator(vec![2.0, -1.0, 3.0]);
    let srcs: Vec<DenseField<f64>> = (0..5)
        .map(|k| field(&[k as f64, 1.0 - k as f64, 0.5 * k as f64]))
        .collect();
    let plain = op.call_batch(&srcs);
    let grouped = op.grouped(2).call_batch(&srcs);
    assert_eq!(plain.len(), grouped.len());
    for (a, b) in plain.iter().zip(grouped.iter()) {
        assert_fields_close(a, b, 1e-14);
    }
}

#[test]
fn variable_length_output_expands_and_groups() {
    // two destinations per source: the copy block, then the doubled block
    let op: LinearOperator<DenseField<f64>> = LinearOperator::builder()
        .forward_batch(|dst: &mut [DenseField<f64>], src: &[DenseField<f64>]| {
            let n = src.len();
            assert_eq!(dst.len(), 2 * n);
            for (i, s) in src.iter().enumerate() {
                dst[i].assign(s);
                dst[n + i].assign(s);
                dst[n + i].axpy(1.0, s);
            }
        })
        .output_len(|n| 2 * n)
        .build();
    let srcs: Vec<DenseField<f64>> = (0..3).map(|k| field(&[k as f64, -1.0])).collect();
    let out = op.call_batch(&srcs);
    assert_eq!(out.len(), 6);
    for (i, s) in srcs.iter().enumerate() {
        assert_fields_close(&out[i], s, 1e-14);
        let mut doubled = s.clone();
        doubled.axpy(1.0, s);
        assert_fields_close(&out[3 + i], &doubled, 1e-14);
    }
    let grouped = op.grouped(2).call_batch(&srcs);
    assert_eq!(grouped.len(), out.len());
    for (a, b) in out.iter().zip(grouped.iter()) {
        assert_fields_close(a, b, 1e-14);
    }
}

#[test]
fn converted_operator_round_trips_within_rounding() {
    let op = diagonal_operator(vec![1.5, 2.5, -4.0]);
    let x = field(&[std::f64::consts::PI, -std::f64::consts::E, 0.125]);
    let native = op.call(&x);
    let converted = op.converted(Precision::Single).call(&x);
    // differs from the native result only by f32 rounding, no systematic bias
    assert_fields_close(&native, &converted, 1e-5);
    let max = native
        .as_slice()
        .iter()
        .zip(converted.as_slice())
        .map(|(a, b)| (a - b).abs())
        .fold(0.0f64, f64::max);
    assert!(max > 0.0, "conversion should actually round through f32");
}

#[test]
#[should_panic(expected = "concrete vector spaces")]
fn converted_requires_concrete_spaces() {
    let op: LinearOperator<DenseField<f64>> = LinearOperator::builder()
        .forward(|dst: &mut DenseField<f64>, src: &DenseField<f64>| dst.assign(src))
        .build();
    let _ = op.converted(Precision::Single);
}

#[test]
fn mismatched_space_routes_through_distribution() {
    // native space holds 3 elements; the source carries two stacked partitions
    let op = diagonal_operator(vec![2.0, 3.0, 4.0]);
    let x = field(&[1.0, 1.0, 1.0, 10.0, 10.0, 10.0]);
    let y = op.call(&x);
    assert_eq!(y.len(), 6);
    assert_fields_close(&y, &field(&[2.0, 3.0, 4.0, 20.0, 30.0, 40.0]), 1e-14);
}

#[test]
fn fresh_destinations_are_zeroed_for_guess_accepting_actions() {
    // forward accumulates into its destination, so it only works when the
    // auto-allocated destination starts from a valid zero guess
    let op: LinearOperator<DenseField<f64>> = LinearOperator::builder()
        .forward(|dst: &mut DenseField<f64>, src: &DenseField<f64>| dst.axpy(1.0, src))
        .accept_guess(true, false)
        .build();
    let x = field(&[1.0, -2.0, 3.0]);
    assert_fields_close(&op.call(&x), &x, 1e-14);
}

#[test]
fn composition_takes_guess_flags_from_the_ends() {
    let a: LinearOperator<DenseField<f64>> = LinearOperator::builder()
        .forward(|dst: &mut DenseField<f64>, src: &DenseField<f64>| dst.assign(src))
        .accept_guess(true, false)
        .build();
    let b: LinearOperator<DenseField<f64>> = LinearOperator::builder()
        .forward(|dst: &mut DenseField<f64>, src: &DenseField<f64>| dst.assign(src))
        .accept_guess(false, true)
        .build();
    assert_eq!((&a * &b).accept_guess(), (true, true));
    assert_eq!((&b * &a).accept_guess(), (false, false));
}
