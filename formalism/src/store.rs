use crate::entities::*;
use crate::kinds::{Auxiliary, Derived, FactKind, Fluent, Static};
use crate::symbols::Sym;
use vega_collections::Idx;

/// Read access to the entities of one kind within a scope.
pub trait Find<T: Entity> {
    /// Hash lookup of a canonical value; `None` when absent.
    fn find(&self, data: &T) -> Option<T::Index>;

    /// Number of entities of this kind visible in the scope.
    fn count(&self) -> usize;

    /// Dereferences an index. The index must have been produced by this
    /// scope (or a parent of it).
    fn resolve(&self, index: T::Index) -> &T;
}

/// Read/write access: [`Find`] plus interning.
pub trait Store<T: Entity>: Find<T> {
    /// Canonicalises `data` and returns its index, interning it first if it
    /// was not seen before. The flag reports whether an insertion happened.
    fn get_or_create(&mut self, data: T) -> (T::Index, bool);
}

impl<'a, T: Entity, S: Find<T>> Find<T> for &'a S {
    fn find(&self, data: &T) -> Option<T::Index> {
        Find::<T>::find(&**self, data)
    }

    fn count(&self) -> usize {
        Find::<T>::count(&**self)
    }

    fn resolve(&self, index: T::Index) -> &T {
        Find::<T>::resolve(&**self, index)
    }
}

/// Read access to the group-indexed ground atoms of kind `K`.
pub trait GroundAtoms<K: FactKind> {
    fn find_ground_atom(&self, data: &GroundAtom<K>) -> Option<GroundAtomIdx<K>>;

    fn ground_atom(&self, index: GroundAtomIdx<K>) -> &GroundAtom<K>;

    /// Number of known ground atoms of `predicate`; their `value` indices are
    /// dense in `0..num_ground_atoms(predicate)`.
    fn num_ground_atoms(&self, predicate: Idx<Predicate<K>>) -> usize;
}

pub trait GroundAtomsMut<K: FactKind>: GroundAtoms<K> {
    fn intern_ground_atom(&mut self, data: GroundAtom<K>) -> (GroundAtomIdx<K>, bool);
}

impl<'a, K: FactKind, S: GroundAtoms<K>> GroundAtoms<K> for &'a S {
    fn find_ground_atom(&self, data: &GroundAtom<K>) -> Option<GroundAtomIdx<K>> {
        (**self).find_ground_atom(data)
    }

    fn ground_atom(&self, index: GroundAtomIdx<K>) -> &GroundAtom<K> {
        (**self).ground_atom(index)
    }

    fn num_ground_atoms(&self, predicate: Idx<Predicate<K>>) -> usize {
        (**self).num_ground_atoms(predicate)
    }
}

/// Name interning within a scope; symbol indices partition across overlays
/// exactly like entity indices.
pub trait Symbols {
    fn find_symbol(&self, name: &str) -> Option<Sym>;
    fn intern_symbol(&mut self, name: &str) -> Sym;
    fn symbol(&self, sym: Sym) -> &str;
    fn num_symbols(&self) -> usize;
}

/// Convenience accessors that read better at call sites than fully qualified
/// trait syntax (`ctx.num::<Object>()` instead of `Find::<Object>::count`).
pub trait ContextExt {
    fn num<T: Entity>(&self) -> usize
    where
        Self: Find<T>,
    {
        <Self as Find<T>>::count(self)
    }
}

impl<C> ContextExt for C {}

/// The per-fact-kind stores a scope must offer.
pub trait KindContext<K: FactKind>:
    Store<Predicate<K>> + Store<Atom<K>> + Store<Literal<K>> + Store<GroundLiteral<K>> + GroundAtomsMut<K>
{
}

impl<C, K: FactKind> KindContext<K> for C where
    C: Store<Predicate<K>>
        + Store<Atom<K>>
        + Store<Literal<K>>
        + Store<GroundLiteral<K>>
        + GroundAtomsMut<K>
{
}

/// The numeric stores a scope must offer for kind `K`.
pub trait NumericContext<K: FactKind>:
    Store<Function<K>> + Store<FunctionTerm<K>> + Store<GroundFunctionTerm<K>> + Store<GroundFunctionTermValue<K>>
{
}

impl<C, K: FactKind> NumericContext<K> for C where
    C: Store<Function<K>>
        + Store<FunctionTerm<K>>
        + Store<GroundFunctionTerm<K>>
        + Store<GroundFunctionTermValue<K>>
{
}

/// A complete repository scope: everything the ingestor, the grounder and the
/// planner navigate through. Implemented by [`crate::Repository`] and by
/// [`crate::Overlay`] over any other scope, so the domain → task → scratch
/// chain composes without renumbering.
pub trait Context:
    Symbols
    + Store<Object>
    + Store<Variable>
    + Store<FunctionExpression>
    + Store<GroundFunctionExpression>
    + Store<NumericConstraint>
    + Store<GroundNumericConstraint>
    + Store<ConjunctiveCondition>
    + Store<GroundConjunctiveCondition>
    + Store<Rule>
    + Store<GroundRule>
    + Store<ConditionalEffect>
    + Store<GroundConditionalEffect>
    + Store<Action>
    + Store<GroundAction>
    + Store<Axiom>
    + Store<Program>
    + Store<Domain>
    + Store<Task>
    + KindContext<Static>
    + KindContext<Fluent>
    + KindContext<Derived>
    + NumericContext<Static>
    + NumericContext<Fluent>
    + NumericContext<Auxiliary>
{
}

impl<C> Context for C where
    C: Symbols
        + Store<Object>
        + Store<Variable>
        + Store<FunctionExpression>
        + Store<GroundFunctionExpression>
        + Store<NumericConstraint>
        + Store<GroundNumericConstraint>
        + Store<ConjunctiveCondition>
        + Store<GroundConjunctiveCondition>
        + Store<Rule>
        + Store<GroundRule>
        + Store<ConditionalEffect>
        + Store<GroundConditionalEffect>
        + Store<Action>
        + Store<GroundAction>
        + Store<Axiom>
        + Store<Program>
        + Store<Domain>
        + Store<Task>
        + KindContext<Static>
        + KindContext<Fluent>
        + KindContext<Derived>
        + NumericContext<Static>
        + NumericContext<Fluent>
        + NumericContext<Auxiliary>
{
}
