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

/// FePt in the 0.34 layout.
///
/// Two species (`Fe-1`, `Pt-1`) in two atom groups labelled `1` and `2`, a
/// single k-point list `default`, spin-orbit coupling switched off.
pub fn fe_pt_inp() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<fleurInput fleurInputVersion="0.34">
   <comment>A Fleur input generator calculation with aiida</comment>
   <calculationSetup>
      <cutoffs Kmax="4.0" Gmax="10.0" GmaxXC="8.7" numbands="0"/>
      <scfLoop itmax="15" minDistance="0.00001" maxIterBroyd="99" imix="Anderson" alpha="0.05" precondParam="0.0" spinf="2.0"/>
      <coreElectrons ctail="T" frcor="F" kcrel="0" coretail_lmax="0"/>
      <xcFunctional name="vwn" relativisticCorrections="F"/>
      <magnetism jspins="2" l_noco="F" swsp="F" lflip="F"/>
      <soc theta="0.0" phi="0.0" l_soc="F" spav="F"/>
   </calculationSetup>
   <cell>
      <bzIntegration valenceElectrons="28.0" mode="hist" fermiSmearingEnergy="0.001">
         <kPointListSelection listName="default"/>
         <kPointLists>
            <kPointList name="default" count="2" type="mesh" nx="2" ny="1" nz="1">
               <kPoint weight="0.5">0.0 0.0 0.0</kPoint>
               <kPoint weight="0.5">0.5 0.0 0.0</kPoint>
            </kPointList>
         </kPointLists>
      </bzIntegration>
      <symmetryOperations>
         <symOp>
            <row-1>1 0 0 0.0</row-1>
            <row-2>0 1 0 0.0</row-2>
            <row-3>0 0 1 0.0</row-3>
         </symOp>
         <symOp>
            <row-1>-1 0 0 0.0</row-1>
            <row-2>0 -1 0 0.0</row-2>
            <row-3>0 0 1 0.0</row-3>
         </symOp>
      </symmetryOperations>
      <bulkLattice scale="1.0" latnam="any">
         <bravaisMatrix>
            <row-1>5.301179702900000 0.000000000000000 0.000000000000000</row-1>
            <row-2>0.000000000000000 7.497000033000000 0.000000000000000</row-2>
            <row-3>0.000000000000000 0.000000000000000 7.992000032000000</row-3>
         </bravaisMatrix>
      </bulkLattice>
   </cell>
   <atomSpecies>
      <species name="Fe-1" element="Fe" atomicNumber="26">
         <mtSphere radius="2.2" gridPoints="787" logIncrement="0.016"/>
         <atomicCutoffs lmax="10" lnonsphr="6"/>
         <electronConfig>
            <coreConfig>[Ne]</coreConfig>
            <valenceConfig>(3s1/2) (3p1/2) (3p3/2) (4s1/2) (3d3/2) (3d5/2)</valenceConfig>
            <stateOccupation state="(3d3/2)" spinUp="2.0" spinDown="1.0"/>
            <stateOccupation state="(3d5/2)" spinUp="3.0" spinDown="0.0"/>
         </electronConfig>
         <energyParameters s="4" p="4" d="3" f="4"/>
         <lo type="SCLO" l="0" n="3"/>
         <lo type="SCLO" l="1" n="3"/>
      </species>
      <species name="Pt-1" element="Pt" atomicNumber="78">
         <mtSphere radius="2.3" gridPoints="787" logIncrement="0.016"/>
         <atomicCutoffs lmax="10" lnonsphr="6"/>
         <electronConfig>
            <coreConfig>[Kr] (4d3/2) (4d5/2) (4f5/2) (4f7/2)</coreConfig>
            <valenceConfig>(5s1/2) (5p1/2) (5p3/2) (6s1/2) (5d3/2) (5d5/2)</valenceConfig>
         </electronConfig>
         <energyParameters s="6" p="6" d="5" f="5"/>
         <lo type="SCLO" l="0" n="5"/>
         <lo type="SCLO" l="1" n="5"/>
      </species>
   </atomSpecies>
   <atomGroups>
      <atomGroup species="Fe-1">
         <relPos label="                   1">0.0 0.0 -0.9964250044</relPos>
         <force calculate="T" relaxXYZ="TTT"/>
      </atomGroup>
      <atomGroup species="Pt-1">
         <relPos label="                   2">1.000/2.000 1.000/2.000 0.9964250044</relPos>
         <force calculate="T" relaxXYZ="TTT"/>
      </atomGroup>
   </atomGroups>
   <output dos="F" band="F" slice="F">
      <checks vchk="F" cdinf="F"/>
   </output>
</fleurInput>
"#
}

/// GaAs with LDA+U in the 0.34 layout.
///
/// `Ga-1` carries a d-orbital (`l=2`) and `As-2` a p-orbital (`l=1`) LDA+U
/// setting; with one spin the density matrix has two blocks.
pub fn ldau_inp() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<fleurInput fleurInputVersion="0.34">
   <comment>GaAs zincblende with LDA+U</comment>
   <calculationSetup>
      <cutoffs Kmax="3.5" Gmax="10.5" GmaxXC="8.7" numbands="0"/>
      <scfLoop itmax="20" minDistance="0.00001" maxIterBroyd="99" imix="Anderson" alpha="0.05"/>
      <coreElectrons ctail="F" frcor="F" kcrel="0"/>
      <xcFunctional name="pbe" relativisticCorrections="F"/>
      <magnetism jspins="1"/>
      <ldaU l_linMix="F" mixParam="0.05" spinf="1.0"/>
   </calculationSetup>
   <cell>
      <bzIntegration valenceElectrons="46.0" mode="hist" fermiSmearingEnergy="0.001">
         <kPointListSelection listName="default"/>
         <kPointLists>
            <kPointList name="default" count="2" type="mesh" nx="2" ny="2" nz="2">
               <kPoint weight="0.25">0.0 0.0 0.0</kPoint>
               <kPoint weight="0.75">0.5 0.5 0.0</kPoint>
            </kPointList>
         </kPointLists>
      </bzIntegration>
      <bulkLattice scale="1.0" latnam="any">
         <bravaisMatrix>
            <row-1>0.0 5.341 5.341</row-1>
            <row-2>5.341 0.0 5.341</row-2>
            <row-3>5.341 5.341 0.0</row-3>
         </bravaisMatrix>
      </bulkLattice>
   </cell>
   <atomSpecies>
      <species name="Ga-1" element="Ga" atomicNumber="31">
         <mtSphere radius="2.3" gridPoints="761" logIncrement="0.016"/>
         <atomicCutoffs lmax="8" lnonsphr="6"/>
         <electronConfig>
            <coreConfig>[Ne] (3s1/2) (3p1/2) (3p3/2)</coreConfig>
            <valenceConfig>(4s1/2) (3d3/2) (3d5/2) (4p1/2)</valenceConfig>
         </electronConfig>
         <energyParameters s="4" p="4" d="3" f="4"/>
         <ldaU l="2" U="5.0" J="0.5" l_amf="F"/>
      </species>
      <species name="As-2" element="As" atomicNumber="33">
         <mtSphere radius="2.3" gridPoints="761" logIncrement="0.016"/>
         <atomicCutoffs lmax="8" lnonsphr="6"/>
         <electronConfig>
            <coreConfig>[Ar] (3d3/2) (3d5/2)</coreConfig>
            <valenceConfig>(4s1/2) (4p1/2) (4p3/2)</valenceConfig>
         </electronConfig>
         <energyParameters s="4" p="4" d="4" f="4"/>
         <ldaU l="1" U="2.0" J="0.2" l_amf="F"/>
      </species>
   </atomSpecies>
   <atomGroups>
      <atomGroup species="Ga-1">
         <relPos label="                   1">0.0 0.0 0.0</relPos>
         <force calculate="T" relaxXYZ="TTT"/>
      </atomGroup>
      <atomGroup species="As-2">
         <relPos label="                   2">1.000/4.000 1.000/4.000 1.000/4.000</relPos>
         <force calculate="T" relaxXYZ="TTT"/>
      </atomGroup>
   </atomGroups>
</fleurInput>
"#
}

/// FePt in the 0.31 layout.
///
/// Only one k-point set exists, given inline as `<kPointList name="legacy">`
/// directly below `bzIntegration`.
pub fn legacy_inp() -> &'static str {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="no"?>
<fleurInput fleurInputVersion="0.31">
   <comment>FePt written for an older Fleur release</comment>
   <calculationSetup>
      <cutoffs Kmax="4.0" Gmax="10.0" GmaxXC="8.7" numbands="0"/>
      <scfLoop itmax="15" minDistance="0.00001" imix="Anderson" alpha="0.05" spinf="2.0"/>
      <coreElectrons ctail="T" frcor="F" kcrel="0"/>
      <xcFunctional name="vwn" relativisticCorrections="F"/>
      <magnetism jspins="2" l_noco="F" swsp="F" lflip="F"/>
   </calculationSetup>
   <cell>
      <bzIntegration valenceElectrons="28.0" mode="hist" fermiSmearingEnergy="0.001">
         <kPointList name="legacy" posScale="1.0" weightScale="1.0" count="2">
            <kPoint weight="1.0">0.0 0.0 0.0</kPoint>
            <kPoint weight="1.0">0.5 0.0 0.0</kPoint>
         </kPointList>
      </bzIntegration>
      <bulkLattice scale="1.0" latnam="any">
         <bravaisMatrix>
            <row-1>5.301179702900000 0.000000000000000 0.000000000000000</row-1>
            <row-2>0.000000000000000 7.497000033000000 0.000000000000000</row-2>
            <row-3>0.000000000000000 0.000000000000000 7.992000032000000</row-3>
         </bravaisMatrix>
      </bulkLattice>
   </cell>
   <atomSpecies>
      <species name="Fe-1" element="Fe" atomicNumber="26">
         <mtSphere radius="2.2" gridPoints="787" logIncrement="0.016"/>
         <atomicCutoffs lmax="10" lnonsphr="6"/>
         <electronConfig>
            <coreConfig>[Ne]</coreConfig>
         </electronConfig>
      </species>
      <species name="Pt-1" element="Pt" atomicNumber="78">
         <mtSphere radius="2.3" gridPoints="787" logIncrement="0.016"/>
         <atomicCutoffs lmax="10" lnonsphr="6"/>
      </species>
   </atomSpecies>
   <atomGroups>
      <atomGroup species="Fe-1">
         <relPos label="                   1">0.0 0.0 -0.9964250044</relPos>
      </atomGroup>
      <atomGroup species="Pt-1">
         <relPos label="                   2">1.000/2.000 1.000/2.000 0.9964250044</relPos>
      </atomGroup>
   </atomGroups>
</fleurInput>
"#
}
