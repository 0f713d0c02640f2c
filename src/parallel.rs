//! Graph colouring of index subsets and unsynchronized access to disjoint slice entries.
use std::collections::BTreeSet;
use std::marker::PhantomData;
use std::ops::AddAssign;

#[derive(Debug)]
struct Color {
    labels: Vec<usize>,
    indices: BTreeSet<usize>,
}

impl Color {
    fn new_with_subset(subset: &[usize], label: usize) -> Self {
        Self {
            labels: vec![label],
            indices: subset.iter().copied().collect(),
        }
    }

    fn try_add_subset(&mut self, subset: &[usize], label: usize) -> bool {
        if subset.iter().all(|idx| !self.indices.contains(idx)) {
            self.labels.push(label);
            self.indices.extend(subset.iter().copied());
            true
        } else {
            false
        }
    }
}

/// Greedily partitions the subsets into colours such that the subsets within a colour are
/// pairwise disjoint.
///
/// Returns the labels (positions in `subsets`) of the members of each colour, in increasing
/// order within each colour.
pub fn sequential_greedy_coloring<S: AsRef<[usize]>>(subsets: &[S]) -> Vec<Vec<usize>> {
    let mut colors = Vec::<Color>::new();

    'subset_loop: for (label, subset) in subsets.iter().enumerate() {
        let subset = subset.as_ref();
        for color in &mut colors {
            if color.try_add_subset(subset, label) {
                continue 'subset_loop;
            }
        }

        // No existing colour accepts the subset
        colors.push(Color::new_with_subset(subset, label));
    }

    colors.into_iter().map(|color| color.labels).collect()
}

/// Shared access to a mutable slice for threads that write to pairwise disjoint entries.
#[derive(Copy)]
pub struct DisjointSliceAccess<'a, T> {
    ptr: *mut T,
    len: usize,
    marker: PhantomData<&'a mut [T]>,
}

impl<'a, T> Clone for DisjointSliceAccess<'a, T> {
    fn clone(&self) -> Self {
        Self {
            ptr: self.ptr,
            len: self.len,
            marker: PhantomData,
        }
    }
}

unsafe impl<'a, T: Send> Sync for DisjointSliceAccess<'a, T> {}
unsafe impl<'a, T: Send> Send for DisjointSliceAccess<'a, T> {}

impl<'a, T> DisjointSliceAccess<'a, T> {
    pub fn new(slice: &'a mut [T]) -> Self {
        Self {
            ptr: slice.as_mut_ptr(),
            len: slice.len(),
            marker: PhantomData,
        }
    }

    /// Computes `slice[index] += value`.
    ///
    /// # Safety
    ///
    /// No other thread may access `slice[index]` for the lifetime of this access object.
    pub unsafe fn add(&self, index: usize, value: T)
    where
        T: AddAssign,
    {
        assert!(index < self.len, "Index out of bounds");
        *self.ptr.add(index) += value;
    }
}
