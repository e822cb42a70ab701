use crate::entities::{
    BinaryOp, Comparator, GroundFunctionExpression, GroundFunctionTerm, GroundNumericConstraint, MultiOp,
};
use crate::kinds::{Auxiliary, Fluent, Static};
use crate::store::Find;
use vega_collections::Idx;

/// Provides the current values of ground function terms during expression
/// evaluation. Undefined variables read as `NaN`, which poisons every
/// comparison they reach.
pub trait NumericSource {
    fn static_value(&self, fterm: Idx<GroundFunctionTerm<Static>>) -> f64;
    fn fluent_value(&self, fterm: Idx<GroundFunctionTerm<Fluent>>) -> f64;
    fn auxiliary_value(&self, fterm: Idx<GroundFunctionTerm<Auxiliary>>) -> f64;
}

/// Evaluates a ground function expression.
///
/// Division follows IEEE semantics, which is exactly the required contract:
/// `x/0` is `+∞` for positive `x`, `-∞` for negative `x` and `NaN` for
/// `0/0`; `NaN` propagates through every operator.
pub fn evaluate<C, S>(expr: Idx<GroundFunctionExpression>, ctx: &C, source: &S) -> f64
where
    C: Find<GroundFunctionExpression>,
    S: NumericSource,
{
    match ctx.resolve(expr) {
        GroundFunctionExpression::Number(value) => value.get(),
        GroundFunctionExpression::Minus(inner) => -evaluate(*inner, ctx, source),
        GroundFunctionExpression::Binary(op, lhs, rhs) => {
            let lhs = evaluate(*lhs, ctx, source);
            let rhs = evaluate(*rhs, ctx, source);
            match op {
                BinaryOp::Add => lhs + rhs,
                BinaryOp::Sub => lhs - rhs,
                BinaryOp::Mul => lhs * rhs,
                BinaryOp::Div => lhs / rhs,
            }
        }
        GroundFunctionExpression::Multi(op, args) => {
            let mut acc = match op {
                MultiOp::Add => 0.0,
                MultiOp::Mul => 1.0,
            };
            for &arg in args.iter() {
                let value = evaluate(arg, ctx, source);
                match op {
                    MultiOp::Add => acc += value,
                    MultiOp::Mul => acc *= value,
                }
            }
            acc
        }
        GroundFunctionExpression::StaticTerm(fterm) => source.static_value(*fterm),
        GroundFunctionExpression::FluentTerm(fterm) => source.fluent_value(*fterm),
        GroundFunctionExpression::AuxiliaryTerm(fterm) => source.auxiliary_value(*fterm),
    }
}

/// Evaluates a ground numeric constraint. Any comparison involving `NaN` is
/// false: a ground instance whose numbers are undefined is simply dropped.
pub fn holds<C, S>(constraint: Idx<GroundNumericConstraint>, ctx: &C, source: &S) -> bool
where
    C: Find<GroundNumericConstraint> + Find<GroundFunctionExpression>,
    S: NumericSource,
{
    let &GroundNumericConstraint { comparator, lhs, rhs } = Find::<GroundNumericConstraint>::resolve(ctx, constraint);
    let lhs = evaluate(lhs, ctx, source);
    let rhs = evaluate(rhs, ctx, source);
    if lhs.is_nan() || rhs.is_nan() {
        return false;
    }
    match comparator {
        Comparator::Eq => lhs == rhs,
        Comparator::Ne => lhs != rhs,
        Comparator::Lt => lhs < rhs,
        Comparator::Le => lhs <= rhs,
        Comparator::Gt => lhs > rhs,
        Comparator::Ge => lhs >= rhs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Real;
    use crate::repository::Repository;
    use crate::store::Store;

    struct NoValues;

    impl NumericSource for NoValues {
        fn static_value(&self, _: Idx<GroundFunctionTerm<Static>>) -> f64 {
            f64::NAN
        }
        fn fluent_value(&self, _: Idx<GroundFunctionTerm<Fluent>>) -> f64 {
            f64::NAN
        }
        fn auxiliary_value(&self, _: Idx<GroundFunctionTerm<Auxiliary>>) -> f64 {
            f64::NAN
        }
    }

    fn number(repo: &mut Repository, value: f64) -> Idx<GroundFunctionExpression> {
        repo.get_or_create(GroundFunctionExpression::Number(Real::new(value))).0
    }

    #[test]
    fn division_by_zero() {
        let mut repo = Repository::new();
        let one = number(&mut repo, 1.0);
        let minus_one = number(&mut repo, -1.0);
        let zero = number(&mut repo, 0.0);

        let (pos, _) = repo.get_or_create(GroundFunctionExpression::Binary(BinaryOp::Div, one, zero));
        let (neg, _) = repo.get_or_create(GroundFunctionExpression::Binary(BinaryOp::Div, minus_one, zero));
        let (nan, _) = repo.get_or_create(GroundFunctionExpression::Binary(BinaryOp::Div, zero, zero));

        assert_eq!(evaluate(pos, &repo, &NoValues), f64::INFINITY);
        assert_eq!(evaluate(neg, &repo, &NoValues), f64::NEG_INFINITY);
        assert!(evaluate(nan, &repo, &NoValues).is_nan());
    }

    #[test]
    fn nan_comparisons_are_false() {
        let mut repo = Repository::new();
        let zero = number(&mut repo, 0.0);
        let (nan, _) = repo.get_or_create(GroundFunctionExpression::Binary(BinaryOp::Div, zero, zero));

        for comparator in [
            Comparator::Eq,
            Comparator::Ne,
            Comparator::Lt,
            Comparator::Le,
            Comparator::Gt,
            Comparator::Ge,
        ] {
            let (c, _) = repo.get_or_create(GroundNumericConstraint {
                comparator,
                lhs: nan,
                rhs: zero,
            });
            assert!(!holds(c, &repo, &NoValues));
        }
    }

    #[test]
    fn multi_operators_fold() {
        let mut repo = Repository::new();
        let two = number(&mut repo, 2.0);
        let three = number(&mut repo, 3.0);
        let four = number(&mut repo, 4.0);

        let (sum, _) = repo.get_or_create(GroundFunctionExpression::Multi(MultiOp::Add, vec![two, three, four]));
        let (product, _) = repo.get_or_create(GroundFunctionExpression::Multi(MultiOp::Mul, vec![two, three, four]));
        let (neg, _) = repo.get_or_create(GroundFunctionExpression::Minus(sum));

        assert_eq!(evaluate(sum, &repo, &NoValues), 9.0);
        assert_eq!(evaluate(product, &repo, &NoValues), 24.0);
        assert_eq!(evaluate(neg, &repo, &NoValues), -9.0);
    }
}
