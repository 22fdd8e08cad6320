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

//! Canonical `inp.xml` documents.
//!
//! - [`fe_pt_inp`]: FePt bulk with spin-orbit coupling and one k-point list (0.34)
//! - [`ldau_inp`]: GaAs with LDA+U on both species (0.34)
//! - [`legacy_inp`]: FePt in the 0.31 layout with a single inline k-point list

mod inputs;

pub use inputs::*;

/// All fixtures as (name, document) pairs.
pub fn all() -> Vec<(&'static str, &'static str)> {
    vec![("fe_pt_inp", fe_pt_inp()), ("ldau_inp", ldau_inp()), ("legacy_inp", legacy_inp())]
}
