//! Ingestion of a parsed domain/problem AST into the interned repository.
//!
//! Parsing itself lives outside this crate; tests and front-ends hand over
//! plain string-based trees. Ingestion validates them (existence, arities,
//! parameter discipline) and produces the interned [`Domain`] and [`Task`]
//! entities together with the scopes that own them: the domain gets a fresh
//! [`Repository`], the task an [`Overlay`] extending it.

use crate::entities::*;
use crate::error::ConstructionError;
use crate::kinds::{Auxiliary, Derived, Fluent, Static};
use crate::overlay::Overlay;
use crate::repository::Repository;
use crate::store::{Context, Find, GroundAtomsMut, Store, Symbols};
use hashbrown::{HashMap, HashSet};
use smallvec::SmallVec;
use vega_collections::Idx;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum PredicateKindAst {
    Static,
    Fluent,
    Derived,
}

#[derive(Clone, Debug)]
pub struct PredicateAst {
    pub name: String,
    pub arity: u32,
    pub kind: PredicateKindAst,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum FunctionKindAst {
    Static,
    Fluent,
}

#[derive(Clone, Debug)]
pub struct FunctionAst {
    pub name: String,
    pub arity: u32,
    pub kind: FunctionKindAst,
}

#[derive(Clone, Debug)]
pub enum TermAst {
    Variable(String),
    Object(String),
}

#[derive(Clone, Debug)]
pub struct AtomAst {
    pub predicate: String,
    pub terms: Vec<TermAst>,
}

#[derive(Clone, Debug)]
pub struct LiteralAst {
    pub polarity: bool,
    pub atom: AtomAst,
}

#[derive(Clone, Debug)]
pub enum ExprAst {
    Number(f64),
    Minus(Box<ExprAst>),
    Binary(BinaryOp, Box<ExprAst>, Box<ExprAst>),
    Multi(MultiOp, Vec<ExprAst>),
    FunctionTerm { function: String, terms: Vec<TermAst> },
}

#[derive(Clone, Debug)]
pub struct ConstraintAst {
    pub comparator: Comparator,
    pub lhs: ExprAst,
    pub rhs: ExprAst,
}

#[derive(Clone, Debug, Default)]
pub struct ConditionAst {
    pub literals: Vec<LiteralAst>,
    pub constraints: Vec<ConstraintAst>,
}

#[derive(Clone, Debug)]
pub struct NumericEffectAst {
    pub op: AssignOp,
    pub function: String,
    pub terms: Vec<TermAst>,
    pub expr: ExprAst,
}

#[derive(Clone, Debug)]
pub struct AuxiliaryEffectAst {
    pub op: AssignOp,
    pub expr: ExprAst,
}

#[derive(Clone, Debug, Default)]
pub struct ConditionalEffectAst {
    /// Extra universally instantiated variables beyond the action parameters.
    pub parameters: Vec<String>,
    pub condition: ConditionAst,
    pub add: Vec<AtomAst>,
    pub delete: Vec<AtomAst>,
    pub numeric_effects: Vec<NumericEffectAst>,
    pub auxiliary_effect: Option<AuxiliaryEffectAst>,
}

#[derive(Clone, Debug)]
pub struct ActionAst {
    pub name: String,
    pub parameters: Vec<String>,
    pub precondition: ConditionAst,
    pub effects: Vec<ConditionalEffectAst>,
}

#[derive(Clone, Debug)]
pub struct AxiomAst {
    pub parameters: Vec<String>,
    pub body: ConditionAst,
    pub head: AtomAst,
}

#[derive(Clone, Debug, Default)]
pub struct DomainAst {
    pub name: String,
    pub predicates: Vec<PredicateAst>,
    pub functions: Vec<FunctionAst>,
    /// Name of the cost accumulator, when the domain tracks action costs.
    pub auxiliary_function: Option<String>,
    pub constants: Vec<String>,
    pub actions: Vec<ActionAst>,
    pub axioms: Vec<AxiomAst>,
}

#[derive(Clone, Debug)]
pub struct GroundAtomAst {
    pub predicate: String,
    pub objects: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct GroundLiteralAst {
    pub polarity: bool,
    pub atom: GroundAtomAst,
}

#[derive(Clone, Debug)]
pub struct GroundValueAst {
    pub function: String,
    pub objects: Vec<String>,
    pub value: f64,
}

#[derive(Clone, Debug, Default)]
pub struct ProblemAst {
    pub name: String,
    pub objects: Vec<String>,
    pub init: Vec<GroundAtomAst>,
    pub init_values: Vec<GroundValueAst>,
    pub goal: Vec<GroundLiteralAst>,
    pub goal_constraints: Vec<ConstraintAst>,
    /// Minimisation expression; defaults to the cost accumulator.
    pub metric: Option<ExprAst>,
}

// ------------------------------------------------------------------
// Name resolution
// ------------------------------------------------------------------

#[derive(Copy, Clone)]
enum PredEntry {
    Static(Idx<Predicate<Static>>, u32),
    Fluent(Idx<Predicate<Fluent>>, u32),
    Derived(Idx<Predicate<Derived>>, u32),
}

impl PredEntry {
    fn arity(self) -> u32 {
        match self {
            PredEntry::Static(_, a) | PredEntry::Fluent(_, a) | PredEntry::Derived(_, a) => a,
        }
    }
}

#[derive(Copy, Clone)]
enum FnEntry {
    Static(Idx<Function<Static>>, u32),
    Fluent(Idx<Function<Fluent>>, u32),
    Auxiliary(Idx<Function<Auxiliary>>),
}

/// String-keyed views of the interned names, rebuilt for each ingestion pass.
#[derive(Default)]
struct Lookup {
    predicates: HashMap<String, PredEntry>,
    functions: HashMap<String, FnEntry>,
    objects: HashMap<String, Idx<Object>>,
}

/// Maps parameter names to their positions in the enclosing scope.
struct ParamScope {
    positions: HashMap<String, u32>,
    variables: Vec<Idx<Variable>>,
}

impl ParamScope {
    fn build<C: Context>(
        ctx: &mut C,
        owner: &str,
        names: impl Iterator<Item = impl AsRef<str>>,
    ) -> Result<Self, ConstructionError> {
        let mut scope = ParamScope {
            positions: HashMap::new(),
            variables: Vec::new(),
        };
        for name in names {
            let name = name.as_ref();
            let position = scope.variables.len() as u32;
            if scope.positions.insert(name.to_string(), position).is_some() {
                return Err(ConstructionError::DuplicateParameter(owner.to_string(), name.to_string()));
            }
            let sym = ctx.intern_symbol(name);
            scope.variables.push(ctx.get_or_create(Variable { name: sym }).0);
        }
        Ok(scope)
    }

    fn resolve(&self, owner: &str, name: &str) -> Result<u32, ConstructionError> {
        self.positions
            .get(name)
            .copied()
            .ok_or_else(|| ConstructionError::UnboundVariable(owner.to_string(), name.to_string()))
    }
}

fn resolve_terms<C: Context>(
    _ctx: &C,
    lookup: &Lookup,
    scope: &ParamScope,
    owner: &str,
    terms: &[TermAst],
) -> Result<TermList, ConstructionError> {
    let mut out = TermList::new();
    for term in terms {
        out.push(match term {
            TermAst::Variable(name) => Term::Parameter(scope.resolve(owner, name)?),
            TermAst::Object(name) => Term::Object(resolve_object(lookup, name)?),
        });
    }
    Ok(out)
}

fn resolve_object(lookup: &Lookup, name: &str) -> Result<Idx<Object>, ConstructionError> {
    lookup
        .objects
        .get(name)
        .copied()
        .ok_or_else(|| ConstructionError::UnknownObject(name.to_string()))
}

fn resolve_binding(lookup: &Lookup, objects: &[String]) -> Result<Binding, ConstructionError> {
    let mut binding = Binding::new();
    for name in objects {
        binding.push(resolve_object(lookup, name)?);
    }
    Ok(binding)
}

fn check_arity(name: &str, expected: u32, got: usize) -> Result<(), ConstructionError> {
    if expected as usize != got {
        return Err(ConstructionError::ArityMismatch(name.to_string(), expected, got as u32));
    }
    Ok(())
}

// ------------------------------------------------------------------
// Lifted construction
// ------------------------------------------------------------------

fn build_expr<C: Context>(
    ctx: &mut C,
    lookup: &Lookup,
    scope: &ParamScope,
    owner: &str,
    expr: &ExprAst,
) -> Result<Idx<FunctionExpression>, ConstructionError> {
    let data = match expr {
        ExprAst::Number(value) => FunctionExpression::Number(Real::new(*value)),
        ExprAst::Minus(inner) => {
            FunctionExpression::Minus(build_expr(ctx, lookup, scope, owner, inner)?)
        }
        ExprAst::Binary(op, lhs, rhs) => FunctionExpression::Binary(
            *op,
            build_expr(ctx, lookup, scope, owner, lhs)?,
            build_expr(ctx, lookup, scope, owner, rhs)?,
        ),
        ExprAst::Multi(op, args) => {
            let mut built = Vec::with_capacity(args.len());
            for arg in args {
                built.push(build_expr(ctx, lookup, scope, owner, arg)?);
            }
            FunctionExpression::Multi(*op, built)
        }
        ExprAst::FunctionTerm { function, terms } => {
            let entry = lookup
                .functions
                .get(function)
                .copied()
                .ok_or_else(|| ConstructionError::UnknownFunction(function.clone()))?;
            let terms = resolve_terms(ctx, lookup, scope, owner, terms)?;
            match entry {
                FnEntry::Static(f, arity) => {
                    check_arity(function, arity, terms.len())?;
                    FunctionExpression::StaticTerm(ctx.get_or_create(FunctionTerm { function: f, terms }).0)
                }
                FnEntry::Fluent(f, arity) => {
                    check_arity(function, arity, terms.len())?;
                    FunctionExpression::FluentTerm(ctx.get_or_create(FunctionTerm { function: f, terms }).0)
                }
                // The accumulator is write-only from the domain's viewpoint.
                FnEntry::Auxiliary(_) => {
                    return Err(ConstructionError::UnknownFunction(function.clone()))
                }
            }
        }
    };
    Ok(ctx.get_or_create(data).0)
}

fn build_condition<C: Context>(
    ctx: &mut C,
    lookup: &Lookup,
    scope: &ParamScope,
    owner: &str,
    cond: &ConditionAst,
) -> Result<Idx<ConjunctiveCondition>, ConstructionError> {
    let mut data = ConjunctiveCondition {
        variables: scope.variables.clone(),
        ..Default::default()
    };

    for literal in &cond.literals {
        let entry = lookup
            .predicates
            .get(&literal.atom.predicate)
            .copied()
            .ok_or_else(|| ConstructionError::UnknownPredicate(literal.atom.predicate.clone()))?;
        check_arity(&literal.atom.predicate, entry.arity(), literal.atom.terms.len())?;
        let terms = resolve_terms(ctx, lookup, scope, owner, &literal.atom.terms)?;
        match entry {
            PredEntry::Static(predicate, _) => {
                let atom = ctx.get_or_create(Atom { predicate, terms }).0;
                data.static_literals.push(
                    ctx.get_or_create(Literal {
                        polarity: literal.polarity,
                        atom,
                    })
                    .0,
                );
            }
            PredEntry::Fluent(predicate, _) => {
                let atom = ctx.get_or_create(Atom { predicate, terms }).0;
                data.fluent_literals.push(
                    ctx.get_or_create(Literal {
                        polarity: literal.polarity,
                        atom,
                    })
                    .0,
                );
            }
            PredEntry::Derived(predicate, _) => {
                let atom = ctx.get_or_create(Atom { predicate, terms }).0;
                data.derived_literals.push(
                    ctx.get_or_create(Literal {
                        polarity: literal.polarity,
                        atom,
                    })
                    .0,
                );
            }
        }
    }

    for constraint in &cond.constraints {
        let lhs = build_expr(ctx, lookup, scope, owner, &constraint.lhs)?;
        let rhs = build_expr(ctx, lookup, scope, owner, &constraint.rhs)?;
        data.constraints.push(
            ctx.get_or_create(NumericConstraint {
                comparator: constraint.comparator,
                lhs,
                rhs,
            })
            .0,
        );
    }

    Ok(ctx.get_or_create(data).0)
}

fn build_fluent_atom<C: Context>(
    ctx: &mut C,
    lookup: &Lookup,
    scope: &ParamScope,
    owner: &str,
    atom: &AtomAst,
) -> Result<Idx<Atom<Fluent>>, ConstructionError> {
    let entry = lookup
        .predicates
        .get(&atom.predicate)
        .copied()
        .ok_or_else(|| ConstructionError::UnknownPredicate(atom.predicate.clone()))?;
    let PredEntry::Fluent(predicate, arity) = entry else {
        return Err(ConstructionError::NotFluent(atom.predicate.clone()));
    };
    check_arity(&atom.predicate, arity, atom.terms.len())?;
    let terms = resolve_terms(ctx, lookup, scope, owner, &atom.terms)?;
    Ok(ctx.get_or_create(Atom { predicate, terms }).0)
}

fn build_action<C: Context>(
    ctx: &mut C,
    lookup: &Lookup,
    ast: &ActionAst,
) -> Result<Idx<Action>, ConstructionError> {
    let scope = ParamScope::build(ctx, &ast.name, ast.parameters.iter())?;
    let precondition = build_condition(ctx, lookup, &scope, &ast.name, &ast.precondition)?;

    let mut effects = Vec::with_capacity(ast.effects.len());
    for effect in &ast.effects {
        // Effect terms index the action parameters first, then the extras.
        let extended = ParamScope::build(
            ctx,
            &ast.name,
            ast.parameters.iter().chain(effect.parameters.iter()),
        )?;
        let condition = build_condition(ctx, lookup, &extended, &ast.name, &effect.condition)?;

        let mut data = ConditionalEffect {
            variables: extended.variables[ast.parameters.len()..].to_vec(),
            condition,
            add_atoms: Vec::new(),
            delete_atoms: Vec::new(),
            numeric_effects: Vec::new(),
            auxiliary_effect: None,
        };
        for atom in &effect.add {
            data.add_atoms
                .push(build_fluent_atom(ctx, lookup, &extended, &ast.name, atom)?);
        }
        for atom in &effect.delete {
            data.delete_atoms
                .push(build_fluent_atom(ctx, lookup, &extended, &ast.name, atom)?);
        }
        for numeric in &effect.numeric_effects {
            let entry = lookup
                .functions
                .get(&numeric.function)
                .copied()
                .ok_or_else(|| ConstructionError::UnknownFunction(numeric.function.clone()))?;
            let FnEntry::Fluent(function, arity) = entry else {
                return Err(ConstructionError::NotFluent(numeric.function.clone()));
            };
            check_arity(&numeric.function, arity, numeric.terms.len())?;
            let terms = resolve_terms(ctx, lookup, &extended, &ast.name, &numeric.terms)?;
            let target = ctx.get_or_create(FunctionTerm { function, terms }).0;
            let expr = build_expr(ctx, lookup, &extended, &ast.name, &numeric.expr)?;
            data.numeric_effects.push(NumericEffect {
                op: numeric.op,
                target,
                expr,
            });
        }
        if let Some(auxiliary) = &effect.auxiliary_effect {
            let expr = build_expr(ctx, lookup, &extended, &ast.name, &auxiliary.expr)?;
            data.auxiliary_effect = Some(AuxiliaryEffect {
                op: auxiliary.op,
                expr,
            });
        }
        effects.push(ctx.get_or_create(data).0);
    }

    let name = ctx.intern_symbol(&ast.name);
    Ok(ctx
        .get_or_create(Action {
            name,
            arity: ast.parameters.len() as u32,
            variables: scope.variables,
            precondition,
            effects,
        })
        .0)
}

fn build_axiom<C: Context>(
    ctx: &mut C,
    lookup: &Lookup,
    ast: &AxiomAst,
) -> Result<Idx<Axiom>, ConstructionError> {
    let owner = format!("axiom {}", ast.head.predicate);
    let scope = ParamScope::build(ctx, &owner, ast.parameters.iter())?;
    let body = build_condition(ctx, lookup, &scope, &owner, &ast.body)?;

    let entry = lookup
        .predicates
        .get(&ast.head.predicate)
        .copied()
        .ok_or_else(|| ConstructionError::UnknownPredicate(ast.head.predicate.clone()))?;
    let PredEntry::Derived(predicate, arity) = entry else {
        return Err(ConstructionError::HeadNotDerived(ast.head.predicate.clone()));
    };
    check_arity(&ast.head.predicate, arity, ast.head.terms.len())?;
    let terms = resolve_terms(ctx, lookup, &scope, &owner, &ast.head.terms)?;
    let head = ctx.get_or_create(Atom { predicate, terms }).0;

    Ok(ctx
        .get_or_create(Axiom {
            variables: scope.variables,
            body,
            head,
        })
        .0)
}

/// Interns a parsed domain into a fresh repository.
pub fn build_domain(ast: &DomainAst) -> Result<(Idx<Domain>, Repository), ConstructionError> {
    let mut repo = Repository::new();
    let mut lookup = Lookup::default();

    let mut constants = Vec::with_capacity(ast.constants.len());
    for name in &ast.constants {
        let sym = repo.intern_symbol(name);
        let object = repo.get_or_create(Object { name: sym }).0;
        lookup.objects.insert(name.clone(), object);
        constants.push(object);
    }

    let mut domain = Domain {
        name: repo.intern_symbol(&ast.name),
        static_predicates: Vec::new(),
        fluent_predicates: Vec::new(),
        derived_predicates: Vec::new(),
        static_functions: Vec::new(),
        fluent_functions: Vec::new(),
        auxiliary_function: None,
        constants,
        actions: Vec::new(),
        axioms: Vec::new(),
    };

    for predicate in &ast.predicates {
        if lookup.predicates.contains_key(&predicate.name) {
            return Err(ConstructionError::DuplicatePredicate(predicate.name.clone()));
        }
        let name = repo.intern_symbol(&predicate.name);
        let entry = match predicate.kind {
            PredicateKindAst::Static => {
                let index = repo
                    .get_or_create(Predicate {
                        name,
                        arity: predicate.arity,
                        kind: Static,
                    })
                    .0;
                domain.static_predicates.push(index);
                PredEntry::Static(index, predicate.arity)
            }
            PredicateKindAst::Fluent => {
                let index = repo
                    .get_or_create(Predicate {
                        name,
                        arity: predicate.arity,
                        kind: Fluent,
                    })
                    .0;
                domain.fluent_predicates.push(index);
                PredEntry::Fluent(index, predicate.arity)
            }
            PredicateKindAst::Derived => {
                let index = repo
                    .get_or_create(Predicate {
                        name,
                        arity: predicate.arity,
                        kind: Derived,
                    })
                    .0;
                domain.derived_predicates.push(index);
                PredEntry::Derived(index, predicate.arity)
            }
        };
        lookup.predicates.insert(predicate.name.clone(), entry);
    }

    for function in &ast.functions {
        if lookup.functions.contains_key(&function.name) {
            return Err(ConstructionError::DuplicateFunction(function.name.clone()));
        }
        let name = repo.intern_symbol(&function.name);
        let entry = match function.kind {
            FunctionKindAst::Static => {
                let index = repo
                    .get_or_create(Function {
                        name,
                        arity: function.arity,
                        kind: Static,
                    })
                    .0;
                domain.static_functions.push(index);
                FnEntry::Static(index, function.arity)
            }
            FunctionKindAst::Fluent => {
                let index = repo
                    .get_or_create(Function {
                        name,
                        arity: function.arity,
                        kind: Fluent,
                    })
                    .0;
                domain.fluent_functions.push(index);
                FnEntry::Fluent(index, function.arity)
            }
        };
        lookup.functions.insert(function.name.clone(), entry);
    }

    if let Some(aux) = &ast.auxiliary_function {
        if lookup.functions.contains_key(aux) {
            return Err(ConstructionError::DuplicateFunction(aux.clone()));
        }
        let name = repo.intern_symbol(aux);
        let index = repo
            .get_or_create(Function {
                name,
                arity: 0,
                kind: Auxiliary,
            })
            .0;
        domain.auxiliary_function = Some(index);
        lookup.functions.insert(aux.clone(), FnEntry::Auxiliary(index));
    }

    let mut action_names = HashSet::new();
    for action in &ast.actions {
        if !action_names.insert(action.name.clone()) {
            return Err(ConstructionError::DuplicateAction(action.name.clone()));
        }
        domain.actions.push(build_action(&mut repo, &lookup, action)?);
    }

    for axiom in &ast.axioms {
        domain.axioms.push(build_axiom(&mut repo, &lookup, axiom)?);
    }

    let (index, _) = repo.get_or_create(domain);
    Ok((index, repo))
}

// ------------------------------------------------------------------
// Ground construction
// ------------------------------------------------------------------

fn rebuild_lookup<C: Context>(ctx: &C, domain: &Domain) -> Lookup {
    let mut lookup = Lookup::default();
    for &p in &domain.static_predicates {
        let data = Find::<Predicate<Static>>::resolve(ctx, p);
        lookup
            .predicates
            .insert(ctx.symbol(data.name).to_string(), PredEntry::Static(p, data.arity));
    }
    for &p in &domain.fluent_predicates {
        let data = Find::<Predicate<Fluent>>::resolve(ctx, p);
        lookup
            .predicates
            .insert(ctx.symbol(data.name).to_string(), PredEntry::Fluent(p, data.arity));
    }
    for &p in &domain.derived_predicates {
        let data = Find::<Predicate<Derived>>::resolve(ctx, p);
        lookup
            .predicates
            .insert(ctx.symbol(data.name).to_string(), PredEntry::Derived(p, data.arity));
    }
    for &f in &domain.static_functions {
        let data = Find::<Function<Static>>::resolve(ctx, f);
        lookup
            .functions
            .insert(ctx.symbol(data.name).to_string(), FnEntry::Static(f, data.arity));
    }
    for &f in &domain.fluent_functions {
        let data = Find::<Function<Fluent>>::resolve(ctx, f);
        lookup
            .functions
            .insert(ctx.symbol(data.name).to_string(), FnEntry::Fluent(f, data.arity));
    }
    if let Some(f) = domain.auxiliary_function {
        let data = Find::<Function<Auxiliary>>::resolve(ctx, f);
        lookup
            .functions
            .insert(ctx.symbol(data.name).to_string(), FnEntry::Auxiliary(f));
    }
    for &o in &domain.constants {
        let data = Find::<Object>::resolve(ctx, o);
        lookup.objects.insert(ctx.symbol(data.name).to_string(), o);
    }
    lookup
}

/// Ground expressions reuse the lifted AST shape with an empty scope; any
/// variable is an error.
fn build_ground_expr<C: Context>(
    ctx: &mut C,
    lookup: &Lookup,
    owner: &str,
    expr: &ExprAst,
) -> Result<Idx<GroundFunctionExpression>, ConstructionError> {
    let data = match expr {
        ExprAst::Number(value) => GroundFunctionExpression::Number(Real::new(*value)),
        ExprAst::Minus(inner) => {
            GroundFunctionExpression::Minus(build_ground_expr(ctx, lookup, owner, inner)?)
        }
        ExprAst::Binary(op, lhs, rhs) => GroundFunctionExpression::Binary(
            *op,
            build_ground_expr(ctx, lookup, owner, lhs)?,
            build_ground_expr(ctx, lookup, owner, rhs)?,
        ),
        ExprAst::Multi(op, args) => {
            let mut built = Vec::with_capacity(args.len());
            for arg in args {
                built.push(build_ground_expr(ctx, lookup, owner, arg)?);
            }
            GroundFunctionExpression::Multi(*op, built)
        }
        ExprAst::FunctionTerm { function, terms } => {
            let entry = lookup
                .functions
                .get(function)
                .copied()
                .ok_or_else(|| ConstructionError::UnknownFunction(function.clone()))?;
            let mut binding = Binding::new();
            for term in terms {
                match term {
                    TermAst::Object(name) => binding.push(resolve_object(lookup, name)?),
                    TermAst::Variable(name) => {
                        return Err(ConstructionError::UnboundVariable(owner.to_string(), name.clone()))
                    }
                }
            }
            match entry {
                FnEntry::Static(f, arity) => {
                    check_arity(function, arity, binding.len())?;
                    GroundFunctionExpression::StaticTerm(
                        ctx.get_or_create(GroundFunctionTerm { function: f, binding }).0,
                    )
                }
                FnEntry::Fluent(f, arity) => {
                    check_arity(function, arity, binding.len())?;
                    GroundFunctionExpression::FluentTerm(
                        ctx.get_or_create(GroundFunctionTerm { function: f, binding }).0,
                    )
                }
                FnEntry::Auxiliary(f) => {
                    check_arity(function, 0, binding.len())?;
                    GroundFunctionExpression::AuxiliaryTerm(
                        ctx.get_or_create(GroundFunctionTerm { function: f, binding }).0,
                    )
                }
            }
        }
    };
    Ok(ctx.get_or_create(data).0)
}

/// Interns a parsed problem on top of an ingested domain.
///
/// The domain repository moves into the returned overlay's parent layer; all
/// problem-specific entities land in the overlay's local layer.
pub fn build_task(
    ast: &ProblemAst,
    domain_index: Idx<Domain>,
    domain_repo: Repository,
) -> Result<(Idx<Task>, Overlay<Repository>), ConstructionError> {
    let mut ctx = Overlay::new(domain_repo);
    let domain = Find::<Domain>::resolve(&ctx, domain_index).clone();
    let mut lookup = rebuild_lookup(&ctx, &domain);

    let mut task = Task {
        domain: domain_index,
        objects: Vec::new(),
        static_atoms: Vec::new(),
        fluent_atoms: Vec::new(),
        static_fterm_values: Vec::new(),
        fluent_fterm_values: Vec::new(),
        auxiliary_fterm: None,
        auxiliary_initial_value: Real::new(0.0),
        goal: Idx::unset(),
        metric: None,
    };

    task.objects = domain.constants.clone();
    for name in &ast.objects {
        let sym = ctx.intern_symbol(name);
        let object = ctx.get_or_create(Object { name: sym }).0;
        if lookup.objects.insert(name.clone(), object).is_none() {
            task.objects.push(object);
        }
    }

    for atom in &ast.init {
        let entry = lookup
            .predicates
            .get(&atom.predicate)
            .copied()
            .ok_or_else(|| ConstructionError::UnknownPredicate(atom.predicate.clone()))?;
        check_arity(&atom.predicate, entry.arity(), atom.objects.len())?;
        let binding = resolve_binding(&lookup, &atom.objects)?;
        match entry {
            PredEntry::Static(predicate, _) => {
                let (index, _) = ctx.intern_ground_atom(GroundAtom { predicate, binding });
                task.static_atoms.push(index);
            }
            PredEntry::Fluent(predicate, _) => {
                let (index, _) = ctx.intern_ground_atom(GroundAtom { predicate, binding });
                task.fluent_atoms.push(index);
            }
            PredEntry::Derived(_, _) => {
                return Err(ConstructionError::DerivedInInitialState(atom.predicate.clone()))
            }
        }
    }

    for value in &ast.init_values {
        let entry = lookup
            .functions
            .get(&value.function)
            .copied()
            .ok_or_else(|| ConstructionError::UnknownFunction(value.function.clone()))?;
        let binding = resolve_binding(&lookup, &value.objects)?;
        match entry {
            FnEntry::Static(function, arity) => {
                check_arity(&value.function, arity, binding.len())?;
                let fterm = ctx.get_or_create(GroundFunctionTerm { function, binding }).0;
                let index = ctx
                    .get_or_create(GroundFunctionTermValue {
                        fterm,
                        value: Real::new(value.value),
                    })
                    .0;
                task.static_fterm_values.push(index);
            }
            FnEntry::Fluent(function, arity) => {
                check_arity(&value.function, arity, binding.len())?;
                let fterm = ctx.get_or_create(GroundFunctionTerm { function, binding }).0;
                let index = ctx
                    .get_or_create(GroundFunctionTermValue {
                        fterm,
                        value: Real::new(value.value),
                    })
                    .0;
                task.fluent_fterm_values.push(index);
            }
            FnEntry::Auxiliary(_) => {
                check_arity(&value.function, 0, binding.len())?;
                task.auxiliary_initial_value = Real::new(value.value);
            }
        }
    }

    if let Some(function) = domain.auxiliary_function {
        task.auxiliary_fterm = Some(
            ctx.get_or_create(GroundFunctionTerm {
                function,
                binding: SmallVec::new(),
            })
            .0,
        );
    }

    let mut goal = GroundConjunctiveCondition::default();
    for literal in &ast.goal {
        let entry = lookup
            .predicates
            .get(&literal.atom.predicate)
            .copied()
            .ok_or_else(|| ConstructionError::UnknownPredicate(literal.atom.predicate.clone()))?;
        check_arity(&literal.atom.predicate, entry.arity(), literal.atom.objects.len())?;
        let binding = resolve_binding(&lookup, &literal.atom.objects)?;
        match entry {
            PredEntry::Static(predicate, _) => {
                let (atom, _) = ctx.intern_ground_atom(GroundAtom { predicate, binding });
                goal.static_literals.push(
                    ctx.get_or_create(GroundLiteral {
                        polarity: literal.polarity,
                        atom,
                    })
                    .0,
                );
            }
            PredEntry::Fluent(predicate, _) => {
                let (atom, _) = ctx.intern_ground_atom(GroundAtom { predicate, binding });
                goal.fluent_literals.push(
                    ctx.get_or_create(GroundLiteral {
                        polarity: literal.polarity,
                        atom,
                    })
                    .0,
                );
            }
            PredEntry::Derived(predicate, _) => {
                let (atom, _) = ctx.intern_ground_atom(GroundAtom { predicate, binding });
                goal.derived_literals.push(
                    ctx.get_or_create(GroundLiteral {
                        polarity: literal.polarity,
                        atom,
                    })
                    .0,
                );
            }
        }
    }
    for constraint in &ast.goal_constraints {
        let lhs = build_ground_expr(&mut ctx, &lookup, "goal", &constraint.lhs)?;
        let rhs = build_ground_expr(&mut ctx, &lookup, "goal", &constraint.rhs)?;
        goal.constraints.push(
            ctx.get_or_create(GroundNumericConstraint {
                comparator: constraint.comparator,
                lhs,
                rhs,
            })
            .0,
        );
    }
    task.goal = ctx.get_or_create(goal).0;

    if let Some(metric) = &ast.metric {
        task.metric = Some(build_ground_expr(&mut ctx, &lookup, "metric", metric)?);
    }

    let (index, _) = ctx.get_or_create(task);
    Ok((index, ctx))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ContextExt;

    fn tiny_domain() -> DomainAst {
        DomainAst {
            name: "logistics".to_string(),
            predicates: vec![
                PredicateAst {
                    name: "place".to_string(),
                    arity: 1,
                    kind: PredicateKindAst::Static,
                },
                PredicateAst {
                    name: "at".to_string(),
                    arity: 1,
                    kind: PredicateKindAst::Fluent,
                },
            ],
            functions: vec![],
            auxiliary_function: None,
            constants: vec![],
            actions: vec![ActionAst {
                name: "goto".to_string(),
                parameters: vec!["?from".to_string(), "?to".to_string()],
                precondition: ConditionAst {
                    literals: vec![
                        LiteralAst {
                            polarity: true,
                            atom: AtomAst {
                                predicate: "place".to_string(),
                                terms: vec![TermAst::Variable("?to".to_string())],
                            },
                        },
                        LiteralAst {
                            polarity: true,
                            atom: AtomAst {
                                predicate: "at".to_string(),
                                terms: vec![TermAst::Variable("?from".to_string())],
                            },
                        },
                    ],
                    constraints: vec![],
                },
                effects: vec![ConditionalEffectAst {
                    add: vec![AtomAst {
                        predicate: "at".to_string(),
                        terms: vec![TermAst::Variable("?to".to_string())],
                    }],
                    delete: vec![AtomAst {
                        predicate: "at".to_string(),
                        terms: vec![TermAst::Variable("?from".to_string())],
                    }],
                    ..Default::default()
                }],
            }],
            axioms: vec![],
        }
    }

    #[test]
    fn domain_roundtrip() {
        let (domain, repo) = build_domain(&tiny_domain()).unwrap();
        let data = Find::<Domain>::resolve(&repo, domain);
        assert_eq!(data.actions.len(), 1);
        assert_eq!(repo.num::<Predicate<Static>>(), 1);
        assert_eq!(repo.num::<Predicate<Fluent>>(), 1);
        let action = Find::<Action>::resolve(&repo, data.actions[0]);
        assert_eq!(action.arity, 2);
        assert_eq!(repo.symbol(action.name), "goto");
    }

    #[test]
    fn duplicate_predicate_is_rejected() {
        let mut ast = tiny_domain();
        ast.predicates.push(PredicateAst {
            name: "at".to_string(),
            arity: 2,
            kind: PredicateKindAst::Static,
        });
        assert_eq!(
            build_domain(&ast),
            Err(ConstructionError::DuplicatePredicate("at".to_string()))
        );
    }

    #[test]
    fn unbound_variable_is_rejected() {
        let mut ast = tiny_domain();
        ast.actions[0].effects[0].add.push(AtomAst {
            predicate: "at".to_string(),
            terms: vec![TermAst::Variable("?ghost".to_string())],
        });
        assert!(matches!(
            build_domain(&ast),
            Err(ConstructionError::UnboundVariable(_, _))
        ));
    }

    #[test]
    fn arity_mismatch_is_rejected() {
        let mut ast = tiny_domain();
        ast.actions[0].precondition.literals[0].atom.terms.clear();
        assert_eq!(
            build_domain(&ast),
            Err(ConstructionError::ArityMismatch("place".to_string(), 1, 0))
        );
    }

    #[test]
    fn duplicate_parameter_is_rejected() {
        let mut ast = tiny_domain();
        ast.actions[0].parameters = vec!["?x".to_string(), "?x".to_string()];
        assert!(matches!(
            build_domain(&ast),
            Err(ConstructionError::DuplicateParameter(_, _))
        ));
    }

    #[test]
    fn task_builds_on_overlay() {
        let (domain, repo) = build_domain(&tiny_domain()).unwrap();
        let problem = ProblemAst {
            name: "p1".to_string(),
            objects: vec!["home".to_string(), "office".to_string()],
            init: vec![
                GroundAtomAst {
                    predicate: "place".to_string(),
                    objects: vec!["home".to_string()],
                },
                GroundAtomAst {
                    predicate: "place".to_string(),
                    objects: vec!["office".to_string()],
                },
                GroundAtomAst {
                    predicate: "at".to_string(),
                    objects: vec!["home".to_string()],
                },
            ],
            goal: vec![GroundLiteralAst {
                polarity: true,
                atom: GroundAtomAst {
                    predicate: "at".to_string(),
                    objects: vec!["office".to_string()],
                },
            }],
            ..Default::default()
        };
        let (task, ctx) = build_task(&problem, domain, repo).unwrap();
        let data = Find::<Task>::resolve(&ctx, task).clone();
        assert_eq!(data.objects.len(), 2);
        assert_eq!(data.static_atoms.len(), 2);
        assert_eq!(data.fluent_atoms.len(), 1);
        let goal = Find::<GroundConjunctiveCondition>::resolve(&ctx, data.goal);
        assert_eq!(goal.fluent_literals.len(), 1);
        // Problem entities live in the overlay; the domain layer is untouched.
        assert_eq!(ctx.parent().num::<Object>(), 0);
        assert_eq!(ctx.num::<Object>(), 2);
    }

    #[test]
    fn unknown_goal_object_is_rejected() {
        let (domain, repo) = build_domain(&tiny_domain()).unwrap();
        let problem = ProblemAst {
            name: "p2".to_string(),
            objects: vec!["home".to_string()],
            goal: vec![GroundLiteralAst {
                polarity: true,
                atom: GroundAtomAst {
                    predicate: "at".to_string(),
                    objects: vec!["nowhere".to_string()],
                },
            }],
            ..Default::default()
        };
        assert_eq!(
            build_task(&problem, domain, repo).map(|_| ()),
            Err(ConstructionError::UnknownObject("nowhere".to_string()))
        );
    }
}
