use crate::entities::{Entity, FlatEntity, GroundAtom, GroundAtomIdx, Predicate};
use crate::kinds::FactKind;
use crate::repository::Repository;
use crate::store::{Find, GroundAtoms, GroundAtomsMut, Store, Symbols};
use crate::symbols::Sym;
use vega_collections::Idx;

/// A scope layered on top of a parent scope.
///
/// The overlay never writes to its parent: lookups consult the parent first,
/// new entities land in the local repository, and local indices are shifted
/// by the parent's size so the combined index space stays dense and parent
/// indices stay valid. Because the parent is held (owned or borrowed) for the
/// overlay's whole lifetime, its sizes cannot change underneath us.
///
/// Overlays nest: `Overlay<Overlay<Repository>>` is the domain → task →
/// scratch-scope chain, and `Overlay<&C>` borrows a parent that outlives the
/// scratch work.
pub struct Overlay<P> {
    parent: P,
    local: Repository,
}

impl<P> Overlay<P> {
    pub fn new(parent: P) -> Self {
        Overlay {
            parent,
            local: Repository::new(),
        }
    }

    pub fn parent(&self) -> &P {
        &self.parent
    }

    pub fn local(&self) -> &Repository {
        &self.local
    }

    /// Discards the local layer and hands the parent back.
    pub fn into_parent(self) -> P {
        self.parent
    }
}

impl<P, T> Find<T> for Overlay<P>
where
    T: FlatEntity,
    P: Find<T>,
    Repository: Store<T>,
{
    fn find(&self, data: &T) -> Option<Idx<T>> {
        if let Some(index) = self.parent.find(data) {
            return Some(index);
        }
        let offset = Find::<T>::count(&self.parent);
        Find::<T>::find(&self.local, data).map(|index| Idx::from(usize::from(index) + offset))
    }

    fn count(&self) -> usize {
        Find::<T>::count(&self.parent) + Find::<T>::count(&self.local)
    }

    fn resolve(&self, index: Idx<T>) -> &T {
        let parent_size = Find::<T>::count(&self.parent);
        if usize::from(index) < parent_size {
            self.parent.resolve(index)
        } else {
            Find::<T>::resolve(&self.local, Idx::from(usize::from(index) - parent_size))
        }
    }
}

impl<P, T> Store<T> for Overlay<P>
where
    T: FlatEntity,
    P: Find<T>,
    Repository: Store<T>,
{
    fn get_or_create(&mut self, mut data: T) -> (Idx<T>, bool) {
        data.canonicalize();
        if let Some(index) = self.parent.find(&data) {
            return (index, false);
        }
        let offset = Find::<T>::count(&self.parent);
        let (index, inserted) = self.local.get_or_create(data);
        (Idx::from(usize::from(index) + offset), inserted)
    }
}

impl<P, K> GroundAtoms<K> for Overlay<P>
where
    K: FactKind,
    P: GroundAtoms<K>,
    Repository: GroundAtomsMut<K>,
{
    fn find_ground_atom(&self, data: &GroundAtom<K>) -> Option<GroundAtomIdx<K>> {
        if let Some(index) = self.parent.find_ground_atom(data) {
            return Some(index);
        }
        let offset = self.parent.num_ground_atoms(data.predicate);
        self.local.find_ground_atom(data).map(|index| GroundAtomIdx {
            predicate: index.predicate,
            value: index.value + offset as u32,
        })
    }

    fn ground_atom(&self, index: GroundAtomIdx<K>) -> &GroundAtom<K> {
        let parent_size = self.parent.num_ground_atoms(index.predicate);
        if (index.value as usize) < parent_size {
            self.parent.ground_atom(index)
        } else {
            self.local.ground_atom(GroundAtomIdx {
                predicate: index.predicate,
                value: index.value - parent_size as u32,
            })
        }
    }

    fn num_ground_atoms(&self, predicate: Idx<Predicate<K>>) -> usize {
        self.parent.num_ground_atoms(predicate) + self.local.num_ground_atoms(predicate)
    }
}

impl<P, K> GroundAtomsMut<K> for Overlay<P>
where
    K: FactKind,
    P: GroundAtoms<K>,
    Repository: GroundAtomsMut<K>,
{
    fn intern_ground_atom(&mut self, data: GroundAtom<K>) -> (GroundAtomIdx<K>, bool) {
        if let Some(index) = self.parent.find_ground_atom(&data) {
            return (index, false);
        }
        let offset = self.parent.num_ground_atoms(data.predicate);
        let (index, inserted) = self.local.intern_ground_atom(data);
        (
            GroundAtomIdx {
                predicate: index.predicate,
                value: index.value + offset as u32,
            },
            inserted,
        )
    }
}

impl<P: Symbols> Symbols for Overlay<P> {
    fn find_symbol(&self, name: &str) -> Option<Sym> {
        if let Some(sym) = self.parent.find_symbol(name) {
            return Some(sym);
        }
        self.local
            .find_symbol(name)
            .map(|sym| Sym::from(usize::from(sym) + self.parent.num_symbols()))
    }

    fn intern_symbol(&mut self, name: &str) -> Sym {
        if let Some(sym) = self.parent.find_symbol(name) {
            return sym;
        }
        let offset = self.parent.num_symbols();
        let sym = self.local.intern_symbol(name);
        Sym::from(usize::from(sym) + offset)
    }

    fn symbol(&self, sym: Sym) -> &str {
        let parent_size = self.parent.num_symbols();
        if usize::from(sym) < parent_size {
            self.parent.symbol(sym)
        } else {
            self.local.symbol(Sym::from(usize::from(sym) - parent_size))
        }
    }

    fn num_symbols(&self) -> usize {
        self.parent.num_symbols() + self.local.num_symbols()
    }
}

// `&P` needs symbol lookups too when used as an overlay parent.
impl<'a, S: Symbols> Symbols for &'a S {
    fn find_symbol(&self, name: &str) -> Option<Sym> {
        (**self).find_symbol(name)
    }

    fn intern_symbol(&mut self, _name: &str) -> Sym {
        unreachable!("borrowed scopes are read-only")
    }

    fn symbol(&self, sym: Sym) -> &str {
        (**self).symbol(sym)
    }

    fn num_symbols(&self) -> usize {
        (**self).num_symbols()
    }
}
