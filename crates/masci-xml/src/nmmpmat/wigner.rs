// masci-xml - schema-driven editing of FLEUR input files
//
// Copyright (c) 2025 masci-xml contributors.
//
// SPDX-License-Identifier: Apache-2.0
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository or at: http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Rotation matrices and basis changes for `l <= 3`.
//!
//! Matrices are 7×7 with the `(2l+1)`-dimensional part centred on index 3
//! and zeros elsewhere, so that they can be applied to blocks directly.

use super::{Block, CENTER, SIZE};
use num_complex::Complex64;
use std::f64::consts::FRAC_1_SQRT_2;

const ZERO: Complex64 = Complex64::new(0.0, 0.0);

fn factorial(n: i32) -> f64 {
    (1..=n).map(f64::from).product()
}

/// Wigner small-d element `d^l_{m'm}(beta)`.
fn small_d(l: i32, mp: i32, m: i32, beta: f64) -> f64 {
    let (cos, sin) = ((beta / 2.0).cos(), (beta / 2.0).sin());
    let prefactor = (factorial(l + mp) * factorial(l - mp) * factorial(l + m) * factorial(l - m)).sqrt();
    let lower = 0.max(m - mp);
    let upper = (l + m).min(l - mp);
    let mut sum = 0.0;
    for s in lower..=upper {
        let sign = if (mp - m + s) % 2 == 0 { 1.0 } else { -1.0 };
        let denominator =
            factorial(l + m - s) * factorial(s) * factorial(mp - m + s) * factorial(l - mp - s);
        sum += sign * cos.powi(2 * l + m - mp - 2 * s) * sin.powi(mp - m + 2 * s) / denominator;
    }
    prefactor * sum
}

/// Wigner D-matrix `D^l_{m'm}(phi, theta, 0) = e^{-i m' phi} d^l_{m'm}(theta)`
/// for Euler angles in radians.
pub fn wigner_d(l: u8, phi: f64, theta: f64) -> Block {
    let l = i32::from(l);
    let mut d = [[ZERO; SIZE]; SIZE];
    for mp in -l..=l {
        for m in -l..=l {
            let phase = Complex64::from_polar(1.0, -f64::from(mp) * phi);
            d[index(mp)][index(m)] = phase * small_d(l, mp, m, theta);
        }
    }
    d
}

/// Density matrix in the complex spherical-harmonic basis for occupations
/// of the real (cubic) harmonics, given in the order `m = -l ..= l`.
///
/// Real harmonics are `(Y_{-m} + (-1)^m Y_m)/√2` for `m > 0` and
/// `i (Y_{-|m|} - (-1)^m Y_{|m|})/√2` for `m < 0`.
pub fn real_to_complex(l: u8, occupations: &[f64]) -> Block {
    let l = i32::from(l);
    let mut u = [[ZERO; SIZE]; SIZE];
    u[CENTER][CENTER] = Complex64::new(1.0, 0.0);
    for m in 1..=l {
        let parity = if m % 2 == 0 { 1.0 } else { -1.0 };
        // cosine type, row +m
        u[index(m)][index(-m)] = Complex64::new(FRAC_1_SQRT_2, 0.0);
        u[index(m)][index(m)] = Complex64::new(parity * FRAC_1_SQRT_2, 0.0);
        // sine type, row -m
        u[index(-m)][index(-m)] = Complex64::new(0.0, FRAC_1_SQRT_2);
        u[index(-m)][index(m)] = Complex64::new(0.0, -parity * FRAC_1_SQRT_2);
    }

    let mut rho = [[ZERO; SIZE]; SIZE];
    for (offset, &n) in occupations.iter().enumerate() {
        let r = index(offset as i32 - l);
        for i in 0..SIZE {
            for j in 0..SIZE {
                rho[i][j] += n * u[r][i] * u[r][j].conj();
            }
        }
    }
    rho
}

fn index(m: i32) -> usize {
    (CENTER as i32 + m) as usize
}

pub(crate) fn matmul(a: &Block, b: &Block) -> Block {
    let mut out = [[ZERO; SIZE]; SIZE];
    for i in 0..SIZE {
        for k in 0..SIZE {
            if a[i][k] == ZERO {
                continue;
            }
            for j in 0..SIZE {
                out[i][j] += a[i][k] * b[k][j];
            }
        }
    }
    out
}

pub(crate) fn adjoint(a: &Block) -> Block {
    let mut out = [[ZERO; SIZE]; SIZE];
    for i in 0..SIZE {
        for j in 0..SIZE {
            out[i][j] = a[j][i].conj();
        }
    }
    out
}

/// `D†·ρ·D`, or `D·ρ·D†` for the inverse rotation.
pub(crate) fn rotate(block: &Block, l: u8, phi: f64, theta: f64, inverse: bool) -> Block {
    let d = wigner_d(l, phi, theta);
    let d_adjoint = adjoint(&d);
    if inverse {
        matmul(&matmul(&d, block), &d_adjoint)
    } else {
        matmul(&matmul(&d_adjoint, block), &d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn assert_close(a: &Block, b: &Block, tolerance: f64) {
        for i in 0..SIZE {
            for j in 0..SIZE {
                assert!((a[i][j] - b[i][j]).norm() < tolerance, "({}, {}): {} != {}", i, j, a[i][j], b[i][j]);
            }
        }
    }

    fn window_identity(l: u8) -> Block {
        let mut id = [[ZERO; SIZE]; SIZE];
        for m in -i32::from(l)..=i32::from(l) {
            id[index(m)][index(m)] = Complex64::new(1.0, 0.0);
        }
        id
    }

    #[test]
    fn test_d_is_unitary() {
        for l in 0..=3u8 {
            let d = wigner_d(l, 0.7, 1.3);
            assert_close(&matmul(&adjoint(&d), &d), &window_identity(l), 1e-12);
        }
    }

    #[test]
    fn test_zero_angles_give_identity() {
        assert_close(&wigner_d(2, 0.0, 0.0), &window_identity(2), 1e-14);
    }

    #[test]
    fn test_known_l1_elements() {
        let d = wigner_d(1, 0.0, PI / 2.0);
        // d^1_{00}(pi/2) = cos(pi/2), d^1_{10}(pi/2) = -sin(pi/2)/sqrt(2)
        assert!(d[index(0)][index(0)].norm() < 1e-12);
        assert!((d[index(1)][index(0)].re + FRAC_1_SQRT_2).abs() < 1e-12);
        assert!((d[index(1)][index(1)].re - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_rotation_round_trip() {
        let mut block = [[ZERO; SIZE]; SIZE];
        for i in 1..=5 {
            for j in 1..=5 {
                block[i][j] = Complex64::new((i * j) as f64 / 10.0, (i as f64 - j as f64) / 7.0);
            }
        }
        let rotated = rotate(&block, 2, 0.4, 1.1, false);
        let back = rotate(&rotated, 2, 0.4, 1.1, true);
        assert_close(&back, &block, 1e-12);
    }

    #[test]
    fn test_real_to_complex_preserves_trace() {
        let occupations = [0.1, 0.2, 0.3, 0.4, 0.5];
        let rho = real_to_complex(2, &occupations);
        let trace: Complex64 = (0..SIZE).map(|i| rho[i][i]).sum();
        assert!((trace.re - 1.5).abs() < 1e-12);
        assert!(trace.im.abs() < 1e-12);
        assert_close(&rho, &adjoint(&rho), 1e-12);

        let uniform = real_to_complex(1, &[0.5, 0.5, 0.5]);
        let mut expected = window_identity(1);
        for row in expected.iter_mut() {
            for value in row.iter_mut() {
                *value *= 0.5;
            }
        }
        assert_close(&uniform, &expected, 1e-12);
    }
}
