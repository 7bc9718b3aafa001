//! Tone-coherent region segmentation.
//!
//! The image is cut into square blocks, each summarized by a normalized
//! intensity histogram. Neighboring blocks whose (merged) histograms are
//! close are joined with a disjoint-set forest until a full pass makes no
//! further merge. Small leftover regions are then absorbed into the
//! adjacent large region of closest mean tone.
//!
//! The result carries a contiguous label map, per-region metadata and a
//! boundary map used by the compositor.

pub mod union_find;

use ndarray::Array2;
use rayon::prelude::*;
use tracing::debug;

use crate::config::{SketchConfig, MAX_HISTOGRAM_BINS};
use union_find::DisjointSet;

/// Largest possible halved-L1 distance between two normalized histograms.
pub const MAX_HISTOGRAM_DISTANCE: f32 = 1.0;

/// Right, down, down-right, down-left. Together with the scan order this
/// visits every 8-connected block pair once per pass.
const MERGE_NEIGHBORS: [(isize, isize); 4] = [(1, 0), (0, 1), (1, 1), (-1, 1)];

/// Segmentation parameters, usually derived from [`SketchConfig`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentationParams {
    pub block_size: usize,
    pub histogram_bins: usize,
    pub merge_threshold: f32,
    pub min_region_size: usize,
}

impl From<&SketchConfig> for SegmentationParams {
    fn from(config: &SketchConfig) -> Self {
        SegmentationParams {
            block_size: config.block_size,
            histogram_bins: config.histogram_bins,
            merge_threshold: config.merge_threshold,
            min_region_size: config.min_region_size,
        }
    }
}

/// Axis-aligned bounds of a region, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionBounds {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub id: u32,
    pub bounds: RegionBounds,
    pub pixel_count: usize,
    /// Mean luminance (0.0-255.0)
    pub mean_tone: f32,
}

/// Segmentation result.
#[derive(Debug, Clone)]
pub struct Segmentation {
    /// Region label per pixel, contiguous over `0..regions.len()`
    pub labels: Array2<u32>,
    /// Metadata indexed by label
    pub regions: Vec<Region>,
    /// True where a 4-neighbor carries a different label
    pub boundaries: Array2<bool>,
}

impl Segmentation {
    pub fn num_regions(&self) -> usize {
        self.regions.len()
    }

    #[inline]
    pub fn label_at(&self, x: usize, y: usize) -> u32 {
        self.labels[[y, x]]
    }
}

/// Stateless segmentation service; construct per call.
pub struct SegmentationEngine {
    params: SegmentationParams,
}

impl SegmentationEngine {
    pub fn new(params: SegmentationParams) -> Self {
        SegmentationEngine { params }
    }

    /// Partition a luminance plane into tone-coherent regions.
    pub fn segment(&self, gray: &Array2<f32>) -> Segmentation {
        let (height, width) = gray.dim();
        let block_size = self.params.block_size.max(1);
        let bins = self.params.histogram_bins.clamp(1, MAX_HISTOGRAM_BINS);

        let grid = BlockGrid::new(width, height, block_size);
        let (mut hist, mut totals) = block_histograms(gray, &grid, bins);

        let mut forest = DisjointSet::new(grid.len());
        let passes = self.merge_blocks(&grid, &mut forest, &mut hist, &mut totals, bins);

        let mut labels: Vec<usize> = (0..height * width)
            .map(|i| forest.find(grid.block_of(i % width, i / width)))
            .collect();

        absorb_small_regions(&mut labels, gray, grid.len(), self.params.min_region_size);

        let labels = relabel(&labels, width, height);
        let regions = region_metadata(&labels, gray);
        let boundaries = extract_boundaries(&labels);

        debug!(
            blocks = grid.len(),
            passes,
            regions = regions.len(),
            "segmentation finished"
        );

        Segmentation {
            labels,
            regions,
            boundaries,
        }
    }

    /// Run union passes until one makes no merge. Returns the pass count.
    fn merge_blocks(
        &self,
        grid: &BlockGrid,
        forest: &mut DisjointSet,
        hist: &mut [u64],
        totals: &mut [u64],
        bins: usize,
    ) -> usize {
        let mut passes = 0;
        loop {
            passes += 1;
            let mut merged = false;

            for by in 0..grid.rows {
                for bx in 0..grid.cols {
                    let block = by * grid.cols + bx;
                    for &(dx, dy) in MERGE_NEIGHBORS.iter() {
                        let Some(neighbor) = grid.neighbor(bx, by, dx, dy) else {
                            continue;
                        };
                        let ra = forest.find(block);
                        let rb = forest.find(neighbor);
                        if ra == rb {
                            continue;
                        }

                        let distance = histogram_distance(hist, totals, ra, rb, bins);
                        if !self.admits(distance) {
                            continue;
                        }

                        if let Some((root, child)) = forest.union(ra, rb) {
                            for b in 0..bins {
                                hist[root * bins + b] += hist[child * bins + b];
                            }
                            totals[root] += totals[child];
                            merged = true;
                        }
                    }
                }
            }

            if !merged {
                return passes;
            }
        }
    }

    /// A threshold at or above the maximum distance admits every pair.
    #[inline]
    fn admits(&self, distance: f32) -> bool {
        distance < self.params.merge_threshold
            || self.params.merge_threshold >= MAX_HISTOGRAM_DISTANCE
    }
}

// ============================================================================
// Blocks and histograms
// ============================================================================

struct BlockGrid {
    cols: usize,
    rows: usize,
    block_size: usize,
}

impl BlockGrid {
    fn new(width: usize, height: usize, block_size: usize) -> Self {
        BlockGrid {
            cols: width.div_ceil(block_size),
            rows: height.div_ceil(block_size),
            block_size,
        }
    }

    fn len(&self) -> usize {
        self.cols * self.rows
    }

    #[inline]
    fn block_of(&self, x: usize, y: usize) -> usize {
        (y / self.block_size) * self.cols + x / self.block_size
    }

    fn neighbor(&self, bx: usize, by: usize, dx: isize, dy: isize) -> Option<usize> {
        let nx = bx as isize + dx;
        let ny = by as isize + dy;
        if nx < 0 || ny < 0 || nx >= self.cols as isize || ny >= self.rows as isize {
            return None;
        }
        Some(ny as usize * self.cols + nx as usize)
    }
}

#[inline]
fn bin_of(tone: f32, bins: usize) -> usize {
    let t = tone.clamp(0.0, 255.0) / 256.0;
    ((t * bins as f32) as usize).min(bins - 1)
}

/// Per-block histogram counts (flat, `bins` per block) and pixel totals.
fn block_histograms(gray: &Array2<f32>, grid: &BlockGrid, bins: usize) -> (Vec<u64>, Vec<u64>) {
    let (height, width) = gray.dim();
    let mut hist = vec![0u64; grid.len() * bins];
    let mut totals = vec![0u64; grid.len()];

    hist.par_chunks_mut(bins)
        .zip(totals.par_iter_mut())
        .enumerate()
        .for_each(|(block, (counts, total))| {
            let x0 = (block % grid.cols) * grid.block_size;
            let y0 = (block / grid.cols) * grid.block_size;
            for y in y0..(y0 + grid.block_size).min(height) {
                for x in x0..(x0 + grid.block_size).min(width) {
                    counts[bin_of(gray[[y, x]], bins)] += 1;
                    *total += 1;
                }
            }
        });

    (hist, totals)
}

/// Half the L1 distance between two normalized histograms, in 0.0-1.0.
fn histogram_distance(hist: &[u64], totals: &[u64], a: usize, b: usize, bins: usize) -> f32 {
    let ta = totals[a].max(1) as f64;
    let tb = totals[b].max(1) as f64;
    let mut l1 = 0.0f64;
    for bin in 0..bins {
        l1 += (hist[a * bins + bin] as f64 / ta - hist[b * bins + bin] as f64 / tb).abs();
    }
    (l1 * 0.5) as f32
}

// ============================================================================
// Small region absorption
// ============================================================================

/// Move every region below `min_size` pixels into its 4-adjacent neighbor
/// of at least `min_size` pixels with the closest mean tone.
///
/// Repeats until nothing moves, so a small region whose only neighbors were
/// small gets resolved once one of them has been absorbed. Regions with no
/// eligible neighbor keep their label.
fn absorb_small_regions(labels: &mut [usize], gray: &Array2<f32>, label_space: usize, min_size: usize) {
    let (height, width) = gray.dim();

    loop {
        let mut counts = vec![0usize; label_space];
        let mut sums = vec![0f64; label_space];
        for (i, &tone) in gray.iter().enumerate() {
            counts[labels[i]] += 1;
            sums[labels[i]] += tone as f64;
        }
        let mean = |l: usize| sums[l] / counts[l].max(1) as f64;
        let undersized = |l: usize| counts[l] > 0 && counts[l] < min_size;

        // (tone difference, target label) per undersized label
        let mut best: Vec<Option<(f64, usize)>> = vec![None; label_space];
        let mut any = false;

        for y in 0..height {
            for x in 0..width {
                let l = labels[y * width + x];
                if !undersized(l) {
                    continue;
                }
                let mut consider = |m: usize| {
                    if m == l || counts[m] < min_size {
                        return;
                    }
                    let diff = (mean(l) - mean(m)).abs();
                    let better = match best[l] {
                        None => true,
                        Some((d, t)) => diff.total_cmp(&d).then(m.cmp(&t)).is_lt(),
                    };
                    if better {
                        best[l] = Some((diff, m));
                        any = true;
                    }
                };
                if x > 0 {
                    consider(labels[y * width + x - 1]);
                }
                if x + 1 < width {
                    consider(labels[y * width + x + 1]);
                }
                if y > 0 {
                    consider(labels[(y - 1) * width + x]);
                }
                if y + 1 < height {
                    consider(labels[(y + 1) * width + x]);
                }
            }
        }

        if !any {
            return;
        }

        for l in labels.iter_mut() {
            if let Some((_, target)) = best[*l] {
                *l = target;
            }
        }
    }
}

// ============================================================================
// Relabeling, metadata, boundaries
// ============================================================================

/// Map arbitrary labels to 0.. in order of first appearance (scan order).
fn relabel(labels: &[usize], width: usize, height: usize) -> Array2<u32> {
    let mut mapping: Vec<Option<u32>> = vec![None; labels.iter().max().map_or(0, |m| m + 1)];
    let mut next = 0u32;

    let dense: Vec<u32> = labels
        .iter()
        .map(|&l| {
            *mapping[l].get_or_insert_with(|| {
                let id = next;
                next += 1;
                id
            })
        })
        .collect();

    Array2::from_shape_fn((height, width), |(y, x)| dense[y * width + x])
}

fn region_metadata(labels: &Array2<u32>, gray: &Array2<f32>) -> Vec<Region> {
    let count = labels.iter().max().map_or(0, |&m| m as usize + 1);
    let (height, width) = labels.dim();

    // (min_x, min_y, max_x, max_y, pixels, tone sum)
    let mut acc = vec![(width, height, 0usize, 0usize, 0usize, 0f64); count];
    for ((y, x), &label) in labels.indexed_iter() {
        let a = &mut acc[label as usize];
        a.0 = a.0.min(x);
        a.1 = a.1.min(y);
        a.2 = a.2.max(x);
        a.3 = a.3.max(y);
        a.4 += 1;
        a.5 += gray[[y, x]] as f64;
    }

    acc.into_iter()
        .enumerate()
        .map(|(id, (min_x, min_y, max_x, max_y, pixels, sum))| Region {
            id: id as u32,
            bounds: RegionBounds {
                x: min_x,
                y: min_y,
                width: max_x - min_x + 1,
                height: max_y - min_y + 1,
            },
            pixel_count: pixels,
            mean_tone: (sum / pixels.max(1) as f64) as f32,
        })
        .collect()
}

/// Mark pixels whose left, right, upper or lower neighbor has another label.
pub fn extract_boundaries(labels: &Array2<u32>) -> Array2<bool> {
    let (height, width) = labels.dim();
    Array2::from_shape_fn((height, width), |(y, x)| {
        let l = labels[[y, x]];
        (x > 0 && labels[[y, x - 1]] != l)
            || (x + 1 < width && labels[[y, x + 1]] != l)
            || (y > 0 && labels[[y - 1, x]] != l)
            || (y + 1 < height && labels[[y + 1, x]] != l)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(block_size: usize, merge_threshold: f32, min_region_size: usize) -> SegmentationParams {
        SegmentationParams {
            block_size,
            histogram_bins: 16,
            merge_threshold,
            min_region_size,
        }
    }

    fn two_halves(width: usize, height: usize) -> Array2<f32> {
        Array2::from_shape_fn((height, width), |(y, _)| if y < height / 2 { 50.0 } else { 200.0 })
    }

    fn assert_contiguous(seg: &Segmentation) {
        let n = seg.num_regions();
        let mut seen = vec![false; n];
        for &l in seg.labels.iter() {
            assert!((l as usize) < n, "label {} out of range", l);
            seen[l as usize] = true;
        }
        assert!(seen.iter().all(|&s| s), "label set has gaps");
    }

    #[test]
    fn test_two_halves_make_two_regions() {
        let gray = two_halves(8, 8);
        let seg = SegmentationEngine::new(params(2, 0.3, 4)).segment(&gray);

        assert_eq!(seg.num_regions(), 2);
        assert_contiguous(&seg);
        assert_eq!(seg.label_at(0, 0), 0);
        assert_eq!(seg.label_at(7, 7), 1);

        let top = &seg.regions[0];
        assert_eq!(top.pixel_count, 32);
        assert_eq!(top.bounds, RegionBounds { x: 0, y: 0, width: 8, height: 4 });
        assert!((top.mean_tone - 50.0).abs() < 1e-4);
        assert!((seg.regions[1].mean_tone - 200.0).abs() < 1e-4);
    }

    #[test]
    fn test_two_halves_boundary_is_the_seam() {
        let gray = two_halves(8, 8);
        let seg = SegmentationEngine::new(params(2, 0.3, 4)).segment(&gray);

        for ((y, _), &b) in seg.boundaries.indexed_iter() {
            assert_eq!(b, y == 3 || y == 4, "unexpected boundary flag in row {}", y);
        }
    }

    #[test]
    fn test_oversized_bin_count_is_clamped() {
        let gray = two_halves(4, 4);
        let params = SegmentationParams {
            histogram_bins: usize::MAX / 2,
            ..params(2, 0.3, 1)
        };
        let seg = SegmentationEngine::new(params).segment(&gray);
        assert_eq!(seg.num_regions(), 2);
        assert_contiguous(&seg);
    }

    #[test]
    fn test_threshold_one_collapses_everything() {
        let gray = Array2::from_shape_fn((12, 12), |(y, x)| ((x * 37 + y * 91) % 256) as f32);
        let seg = SegmentationEngine::new(params(3, 1.0, 1)).segment(&gray);
        assert_eq!(seg.num_regions(), 1);
        assert!(seg.boundaries.iter().all(|&b| !b));
    }

    #[test]
    fn test_zero_threshold_keeps_blocks_apart() {
        // Uniform image, but distance 0 is not < 0
        let gray = Array2::from_elem((4, 4), 100.0f32);
        let seg = SegmentationEngine::new(params(2, 0.0, 1)).segment(&gray);
        assert_eq!(seg.num_regions(), 4);
        assert_contiguous(&seg);
    }

    #[test]
    fn test_block_larger_than_image_is_single_region() {
        let gray = two_halves(5, 6);
        let seg = SegmentationEngine::new(params(64, 0.0, 1)).segment(&gray);
        assert_eq!(seg.num_regions(), 1);
        assert_eq!(seg.regions[0].pixel_count, 30);
    }

    #[test]
    fn test_orphans_keep_their_label() {
        // Three 2x2 blocks of different tone that never merge (threshold 0).
        // With a minimum of 5 pixels every region is undersized, so none is
        // an eligible target and all three survive.
        let gray = Array2::from_shape_fn((2, 6), |(_, x)| match x {
            0 | 1 => 0.0,
            2 | 3 => 120.0,
            _ => 255.0,
        });
        let seg = SegmentationEngine::new(params(2, 0.0, 5)).segment(&gray);
        assert_eq!(seg.num_regions(), 3);
        assert_contiguous(&seg);
    }

    #[test]
    fn test_absorption_picks_closest_mean_tone() {
        // 8x4: left 4x4 block of 10, right 4x4 block of 250, and a
        // 2x2 block of 60 carved into the top-right of the left block.
        let mut gray = Array2::from_shape_fn((4, 8), |(_, x)| if x < 4 { 10.0 } else { 250.0 });
        for y in 0..2 {
            for x in 2..4 {
                gray[[y, x]] = 60.0;
            }
        }
        let seg = SegmentationEngine::new(params(2, 0.3, 5)).segment(&gray);

        assert_eq!(seg.num_regions(), 2);
        // The 60-block touches both sides and joins the dark one
        assert_eq!(seg.label_at(2, 0), seg.label_at(0, 0));
        assert_ne!(seg.label_at(3, 0), seg.label_at(4, 0));
    }

    #[test]
    fn test_transitive_absorption() {
        // A 1x6 strip of 2-pixel blocks: 0 | 40 | 200 200 200 200
        // Block 0 only touches block 1, which is itself small; once block 1
        // joins the large region block 0 can follow.
        let gray = Array2::from_shape_fn((1, 12), |(_, x)| match x {
            0 | 1 => 0.0,
            2 | 3 => 40.0,
            _ => 200.0,
        });
        let seg = SegmentationEngine::new(params(2, 0.3, 6)).segment(&gray);
        assert_eq!(seg.num_regions(), 1);
    }

    #[test]
    fn test_boundary_iff_neighbor_differs() {
        let gray = Array2::from_shape_fn((10, 10), |(y, x)| if (x / 3 + y / 4) % 2 == 0 { 30.0 } else { 220.0 });
        let seg = SegmentationEngine::new(params(1, 0.2, 1)).segment(&gray);
        assert_contiguous(&seg);

        let (h, w) = seg.labels.dim();
        for y in 0..h {
            for x in 0..w {
                let l = seg.labels[[y, x]];
                let differs = (x > 0 && seg.labels[[y, x - 1]] != l)
                    || (x + 1 < w && seg.labels[[y, x + 1]] != l)
                    || (y > 0 && seg.labels[[y - 1, x]] != l)
                    || (y + 1 < h && seg.labels[[y + 1, x]] != l);
                assert_eq!(seg.boundaries[[y, x]], differs);
            }
        }
    }

    #[test]
    fn test_segmentation_is_deterministic() {
        let gray = Array2::from_shape_fn((24, 20), |(y, x)| ((x * 13 + y * 7) % 200) as f32);
        let engine = SegmentationEngine::new(params(4, 0.4, 20));
        let a = engine.segment(&gray);
        let b = engine.segment(&gray);
        assert_eq!(a.labels, b.labels);
        assert_eq!(a.regions, b.regions);
    }
}
