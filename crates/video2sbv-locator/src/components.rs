use std::cmp;

/// Axis-aligned box around one 8-connected foreground component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComponentRect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl ComponentRect {
    pub fn area(&self) -> usize {
        self.width * self.height
    }
}

#[derive(Clone, Copy)]
struct RowRun {
    start: usize,
    end: usize,
    row: usize,
    label: u32,
}

#[derive(Clone, Copy)]
struct ComponentStats {
    min_x: usize,
    max_x: usize,
    min_y: usize,
    max_y: usize,
}

impl ComponentStats {
    fn new(run: &RowRun) -> Self {
        Self {
            min_x: run.start,
            max_x: run.end - 1,
            min_y: run.row,
            max_y: run.row,
        }
    }

    fn absorb(&mut self, run: &RowRun) {
        self.min_x = self.min_x.min(run.start);
        self.max_x = self.max_x.max(run.end - 1);
        self.min_y = self.min_y.min(run.row);
        self.max_y = self.max_y.max(run.row);
    }

    fn rect(&self) -> ComponentRect {
        ComponentRect {
            x: self.min_x,
            y: self.min_y,
            width: self.max_x - self.min_x + 1,
            height: self.max_y - self.min_y + 1,
        }
    }
}

/// Bounding boxes of the 8-connected components of `mask` (non-zero pixels
/// are foreground), ordered by the row-major position of each component's
/// first pixel.
pub fn component_rects(mask: &[u8], width: usize, height: usize) -> Vec<ComponentRect> {
    if width == 0 || height == 0 {
        return Vec::new();
    }

    let mut runs = Vec::new();
    let mut offsets = vec![0usize; height + 1];
    for row in 0..height {
        offsets[row] = runs.len();
        let row_data = &mask[row * width..(row + 1) * width];
        let mut x = 0usize;
        while x < width {
            while x < width && row_data[x] == 0 {
                x += 1;
            }
            if x >= width {
                break;
            }
            let start = x;
            while x < width && row_data[x] != 0 {
                x += 1;
            }
            runs.push(RowRun {
                start,
                end: x,
                row,
                label: 0,
            });
        }
    }
    offsets[height] = runs.len();

    if runs.is_empty() {
        return Vec::new();
    }

    let mut dsu = DisjointSet::with_capacity(runs.len());
    for run in runs.iter_mut() {
        run.label = dsu.make_set();
    }

    for row in 1..height {
        let mut prev = offsets[row - 1];
        let prev_end = offsets[row];
        let mut curr = offsets[row];
        let curr_end = offsets[row + 1];

        while prev < prev_end && curr < curr_end {
            let run_a = runs[prev];
            let run_b = runs[curr];
            if runs_touch(&run_a, &run_b) {
                dsu.union(run_a.label, run_b.label);
            }
            if run_a.end <= run_b.end {
                prev += 1;
            } else {
                curr += 1;
            }
        }
    }

    let mut stats: Vec<Option<ComponentStats>> = vec![None; dsu.len()];
    let mut order = Vec::new();
    for run in &runs {
        let root = dsu.find(run.label) as usize;
        match &mut stats[root] {
            Some(entry) => entry.absorb(run),
            slot @ None => {
                *slot = Some(ComponentStats::new(run));
                order.push(root);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|root| stats[root].map(|entry| entry.rect()))
        .collect()
}

// Runs on adjacent rows belong together when they overlap or meet diagonally.
fn runs_touch(a: &RowRun, b: &RowRun) -> bool {
    cmp::max(a.start, b.start) <= cmp::min(a.end, b.end)
}

struct DisjointSet {
    parent: Vec<u32>,
    rank: Vec<u8>,
}

impl DisjointSet {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            parent: Vec::with_capacity(capacity),
            rank: Vec::with_capacity(capacity),
        }
    }

    fn len(&self) -> usize {
        self.parent.len()
    }

    fn make_set(&mut self) -> u32 {
        let idx = self.parent.len() as u32;
        self.parent.push(idx);
        self.rank.push(0);
        idx
    }

    fn find(&mut self, x: u32) -> u32 {
        let mut root = x;
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }
        let mut node = x;
        while self.parent[node as usize] != root {
            let next = self.parent[node as usize];
            self.parent[node as usize] = root;
            node = next;
        }
        root
    }

    fn union(&mut self, a: u32, b: u32) {
        let mut root_a = self.find(a);
        let mut root_b = self.find(b);
        if root_a == root_b {
            return;
        }
        let rank_a = self.rank[root_a as usize];
        let rank_b = self.rank[root_b as usize];
        if rank_a < rank_b {
            std::mem::swap(&mut root_a, &mut root_b);
        }
        self.parent[root_b as usize] = root_a;
        if rank_a == rank_b {
            self.rank[root_a as usize] = rank_a + 1;
        }
    }
}
