use crate::entities::*;
use crate::kinds::FactKind;
use crate::store::{Find, GroundAtoms, Symbols};
use std::fmt::{Display, Formatter, Result};
use vega_collections::Idx;

/// Pairs an index with the scope it belongs to, the handle clients navigate
/// and print through. An index alone cannot be rendered; the view borrows the
/// repository that owns the names.
pub struct View<'c, I, C> {
    pub index: I,
    pub ctx: &'c C,
}

impl<'c, I: Copy, C> View<'c, I, C> {
    pub fn new(index: I, ctx: &'c C) -> Self {
        View { index, ctx }
    }
}

/// Shorthand for [`View::new`].
pub fn view<I: Copy, C>(index: I, ctx: &C) -> View<'_, I, C> {
    View::new(index, ctx)
}

fn write_sexpr<C: Symbols + Find<Object>>(
    f: &mut Formatter<'_>,
    ctx: &C,
    name: &str,
    binding: &[Idx<Object>],
) -> Result {
    write!(f, "({name}")?;
    for &object in binding {
        write!(f, " {}", ctx.symbol(Find::<Object>::resolve(ctx, object).name))?;
    }
    write!(f, ")")
}

impl<'c, K, C> Display for View<'c, GroundAtomIdx<K>, C>
where
    K: FactKind,
    C: GroundAtoms<K> + Find<Predicate<K>> + Find<Object> + Symbols,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let atom = self.ctx.ground_atom(self.index);
        let name = self
            .ctx
            .symbol(Find::<Predicate<K>>::resolve(self.ctx, atom.predicate).name);
        write_sexpr(f, self.ctx, name, &atom.binding)
    }
}

impl<'c, K, C> Display for View<'c, Idx<GroundLiteral<K>>, C>
where
    K: FactKind,
    C: GroundAtoms<K> + Find<GroundLiteral<K>> + Find<Predicate<K>> + Find<Object> + Symbols,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let literal = Find::<GroundLiteral<K>>::resolve(self.ctx, self.index);
        if literal.polarity {
            write!(f, "{}", view(literal.atom, self.ctx))
        } else {
            write!(f, "(not {})", view(literal.atom, self.ctx))
        }
    }
}

impl<'c, K, C> Display for View<'c, Idx<Atom<K>>, C>
where
    K: FactKind,
    C: Find<Atom<K>> + Find<Predicate<K>> + Find<Object> + Symbols,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let atom = Find::<Atom<K>>::resolve(self.ctx, self.index);
        write!(
            f,
            "({}",
            self.ctx
                .symbol(Find::<Predicate<K>>::resolve(self.ctx, atom.predicate).name)
        )?;
        for &term in atom.terms.iter() {
            match term {
                Term::Parameter(i) => write!(f, " ?x{i}")?,
                Term::Object(object) => write!(
                    f,
                    " {}",
                    self.ctx.symbol(Find::<Object>::resolve(self.ctx, object).name)
                )?,
            }
        }
        write!(f, ")")
    }
}

impl<'c, C> Display for View<'c, Idx<GroundAction>, C>
where
    C: Find<GroundAction> + Find<Action> + Find<Object> + Symbols,
{
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let ground = Find::<GroundAction>::resolve(self.ctx, self.index);
        let name = self.ctx.symbol(Find::<Action>::resolve(self.ctx, ground.action).name);
        write_sexpr(f, self.ctx, name, &ground.binding)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinds::Fluent;
    use crate::repository::Repository;
    use crate::store::{GroundAtomsMut, Store};
    use smallvec::smallvec;

    #[test]
    fn ground_atom_renders_as_sexpr() {
        let mut repo = Repository::new();
        let at = repo.intern_symbol("at");
        let (pred, _) = repo.get_or_create(Predicate {
            name: at,
            arity: 2,
            kind: Fluent,
        });
        let ball = repo.intern_symbol("ball1");
        let room = repo.intern_symbol("rooma");
        let (b, _) = repo.get_or_create(Object { name: ball });
        let (r, _) = repo.get_or_create(Object { name: room });
        let (atom, _) = repo.intern_ground_atom(GroundAtom {
            predicate: pred,
            binding: smallvec![b, r],
        });

        assert_eq!(format!("{}", view(atom, &repo)), "(at ball1 rooma)");
    }
}
