use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;
use std::sync::{Arc, Mutex, MutexGuard};

/// Objects that can be recycled through a pool.
pub trait Reusable {
    /// Restores the object to its freshly-constructed state while keeping
    /// already allocated capacity.
    fn reset(&mut self);
}

struct PoolEntry<T> {
    value: RefCell<T>,
}

type FreeStack<T> = Rc<RefCell<Vec<Rc<PoolEntry<T>>>>>;

/// Recycling pool for a single heap-expensive type.
///
/// [`SharedObjectPool::acquire`] hands out a reset object, allocating only
/// when the free stack is empty. The returned [`PoolPtr`] is refcounted:
/// cloning it is O(1) and allocation-free, and when the last clone is dropped
/// the object returns to the free stack instead of being destroyed.
///
/// This is deliberately not a general shared-ownership primitive: the
/// intended use is one logical owner mutating the object for the duration of
/// a single step, with short-lived clones for hand-off.
pub struct SharedObjectPool<T> {
    free: FreeStack<T>,
    allocated: RefCell<usize>,
}

impl<T> Default for SharedObjectPool<T> {
    fn default() -> Self {
        SharedObjectPool {
            free: Rc::new(RefCell::new(Vec::new())),
            allocated: RefCell::new(0),
        }
    }
}

impl<T: Default + Reusable> SharedObjectPool<T> {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn acquire(&self) -> PoolPtr<T> {
        let entry = match self.free.borrow_mut().pop() {
            Some(entry) => entry,
            None => {
                *self.allocated.borrow_mut() += 1;
                Rc::new(PoolEntry {
                    value: RefCell::new(T::default()),
                })
            }
        };
        entry.value.borrow_mut().reset();
        PoolPtr {
            entry: Some(entry),
            free: Rc::clone(&self.free),
        }
    }

    /// Number of objects ever allocated by this pool.
    pub fn size(&self) -> usize {
        *self.allocated.borrow()
    }

    /// Number of objects currently sitting on the free stack.
    pub fn num_free(&self) -> usize {
        self.free.borrow().len()
    }
}

/// Refcounted handle to a pooled object. See [`SharedObjectPool`].
pub struct PoolPtr<T> {
    entry: Option<Rc<PoolEntry<T>>>,
    free: FreeStack<T>,
}

impl<T> PoolPtr<T> {
    fn entry(&self) -> &Rc<PoolEntry<T>> {
        self.entry.as_ref().expect("pool pointer already released")
    }

    pub fn borrow(&self) -> Ref<'_, T> {
        self.entry().value.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.entry().value.borrow_mut()
    }

    pub fn ref_count(&self) -> usize {
        Rc::strong_count(self.entry())
    }
}

impl<T> Clone for PoolPtr<T> {
    fn clone(&self) -> Self {
        PoolPtr {
            entry: Some(Rc::clone(self.entry())),
            free: Rc::clone(&self.free),
        }
    }
}

impl<T> Drop for PoolPtr<T> {
    fn drop(&mut self) {
        if let Some(entry) = self.entry.take() {
            if Rc::strong_count(&entry) == 1 {
                self.free.borrow_mut().push(entry);
            }
        }
    }
}

struct SyncPoolEntry<T> {
    value: Mutex<T>,
}

type SyncFreeStack<T> = Arc<Mutex<Vec<Arc<SyncPoolEntry<T>>>>>;

/// Thread-safe variant of [`SharedObjectPool`] for per-worker scratch objects
/// acquired from a shared pool.
pub struct SyncSharedObjectPool<T> {
    free: SyncFreeStack<T>,
}

impl<T> Default for SyncSharedObjectPool<T> {
    fn default() -> Self {
        SyncSharedObjectPool {
            free: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T: Default + Reusable> SyncSharedObjectPool<T> {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn acquire(&self) -> SyncPoolPtr<T> {
        let entry = {
            let mut free = self.free.lock().expect("pool mutex poisoned");
            free.pop()
        };
        let entry = entry.unwrap_or_else(|| {
            Arc::new(SyncPoolEntry {
                value: Mutex::new(T::default()),
            })
        });
        entry.value.lock().expect("pool mutex poisoned").reset();
        SyncPoolPtr {
            entry: Some(entry),
            free: Arc::clone(&self.free),
        }
    }

    pub fn num_free(&self) -> usize {
        self.free.lock().expect("pool mutex poisoned").len()
    }
}

pub struct SyncPoolPtr<T> {
    entry: Option<Arc<SyncPoolEntry<T>>>,
    free: SyncFreeStack<T>,
}

impl<T> SyncPoolPtr<T> {
    fn entry(&self) -> &Arc<SyncPoolEntry<T>> {
        self.entry.as_ref().expect("pool pointer already released")
    }

    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.entry().value.lock().expect("pool mutex poisoned")
    }
}

impl<T> Clone for SyncPoolPtr<T> {
    fn clone(&self) -> Self {
        SyncPoolPtr {
            entry: Some(Arc::clone(self.entry())),
            free: Arc::clone(&self.free),
        }
    }
}

impl<T> Drop for SyncPoolPtr<T> {
    fn drop(&mut self) {
        if let Some(entry) = self.entry.take() {
            if Arc::strong_count(&entry) == 1 {
                self.free.lock().expect("pool mutex poisoned").push(entry);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Scratch {
        data: Vec<u32>,
    }

    impl Reusable for Scratch {
        fn reset(&mut self) {
            self.data.clear();
        }
    }

    #[test]
    fn acquire_resets_and_recycles() {
        let pool: SharedObjectPool<Scratch> = SharedObjectPool::new();
        {
            let ptr = pool.acquire();
            ptr.borrow_mut().data.extend([1, 2, 3]);
            assert_eq!(pool.size(), 1);
            assert_eq!(pool.num_free(), 0);
        }
        assert_eq!(pool.num_free(), 1);

        // The recycled object comes back reset, not reallocated.
        let ptr = pool.acquire();
        assert!(ptr.borrow().data.is_empty());
        assert_eq!(pool.size(), 1);
    }

    #[test]
    fn clone_shares_until_last_drop() {
        let pool: SharedObjectPool<Scratch> = SharedObjectPool::new();
        let a = pool.acquire();
        let b = a.clone();
        assert_eq!(a.ref_count(), 2);
        drop(a);
        assert_eq!(pool.num_free(), 0);
        drop(b);
        assert_eq!(pool.num_free(), 1);
    }

    #[test]
    fn sync_pool_roundtrip() {
        let pool: SyncSharedObjectPool<Scratch> = SyncSharedObjectPool::new();
        {
            let ptr = pool.acquire();
            ptr.lock().data.push(9);
        }
        assert_eq!(pool.num_free(), 1);
        let ptr = pool.acquire();
        assert!(ptr.lock().data.is_empty());
    }
}
