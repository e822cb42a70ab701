use crate::heuristics::Heuristic;
use crate::metric::{is_applicable, is_statically_applicable};
use crate::plan::{Plan, PlanStep};
use crate::search::event::EventHandler;
use crate::search::{
    CountdownWatch, OpenList, SearchNodeStatus, SearchOptions, SearchResult, SearchSpace,
    SearchStatus, TotalF64,
};
use crate::state::StateIndex;
use crate::successor::{Node, SuccessorGenerator};
use crate::task::LiftedTask;
use tracing::debug;

/// Eager A★: best-first on `f = g + h`, ties broken by node status and then
/// by insertion order. With an admissible heuristic the returned plan is
/// cost-optimal. Two runs over the same task and heuristic expand the same
/// nodes in the same order and return identical plans.
pub fn astar<H: Heuristic, E: EventHandler>(
    task: &mut LiftedTask,
    generator: &mut SuccessorGenerator,
    heuristic: &mut H,
    event_handler: &mut E,
    options: &SearchOptions,
) -> SearchResult {
    let goal = task.task_data.goal;

    // A goal whose static part cannot be satisfied stays unreachable no
    // matter what the search does.
    if !is_statically_applicable(&task.ctx, goal, &task.static_facts) {
        event_handler.on_unsolvable();
        return SearchResult::terminal(SearchStatus::Unsolvable);
    }

    heuristic.set_goal(goal);

    let start = generator.initial_node(task);
    let mut space = SearchSpace::new();

    {
        let state = generator.state(start.state);
        let state = state.borrow();
        let context = task.state_context(&state, start.auxiliary);
        if is_applicable(&task.ctx, goal, &context) {
            event_handler.on_end_search();
            let plan = Plan {
                initial: start.state,
                initial_metric: start.metric,
                steps: Vec::new(),
            };
            event_handler.on_solved(&plan);
            return SearchResult {
                status: SearchStatus::Solved,
                plan: Some(plan),
            };
        }
    }

    let start_h = evaluate(heuristic, task, generator, &start);
    let start_node = space.node_mut(start.state);
    start_node.g_value = start.metric;
    start_node.auxiliary = start.auxiliary;
    start_node.status = if start_h.is_infinite() {
        SearchNodeStatus::DeadEnd
    } else {
        SearchNodeStatus::Open
    };

    if start_node.status == SearchNodeStatus::DeadEnd {
        event_handler.on_unsolvable();
        return SearchResult::terminal(SearchStatus::Unsolvable);
    }

    let start_f = start.metric + start_h;
    event_handler.on_start_search(&start, start_f);

    let mut open: OpenList<(TotalF64, SearchNodeStatus)> = OpenList::new();
    open.push((TotalF64(start_f), SearchNodeStatus::Open), start.state);
    let mut f_layer = start_f;

    let watch = options.max_time.map(CountdownWatch::new);
    let mut successors = Vec::new();

    while let Some(((TotalF64(f), _), state_index)) = open.pop() {
        if watch.as_ref().is_some_and(|w| w.has_finished()) {
            return SearchResult::terminal(SearchStatus::OutOfTime);
        }

        let record = *space.node(state_index);
        if matches!(record.status, SearchNodeStatus::Closed | SearchNodeStatus::DeadEnd) {
            continue;
        }
        let node = Node {
            state: state_index,
            auxiliary: record.auxiliary,
            metric: record.g_value,
        };

        if f > f_layer {
            event_handler.on_finish_f_layer(f_layer);
            f_layer = f;
        }

        if record.status == SearchNodeStatus::Goal {
            event_handler.on_expand_goal_node(&node);
            event_handler.on_end_search();
            let plan = extract_plan(&space, start, state_index);
            event_handler.on_solved(&plan);
            return SearchResult {
                status: SearchStatus::Solved,
                plan: Some(plan),
            };
        }

        event_handler.on_expand_node(&node);
        space.node_mut(state_index).status = SearchNodeStatus::Closed;
        event_handler.on_close_node(&node);

        generator.successors(task, &node, &mut successors);

        for &(action, successor) in &successors {
            let is_new = {
                let entry = space.node_mut(successor.state);
                entry.status == SearchNodeStatus::New
            };

            if is_new && generator.repository.len() > options.max_num_states {
                debug!(states = generator.repository.len(), "state budget exceeded");
                return SearchResult::terminal(SearchStatus::OutOfStates);
            }

            if is_new {
                event_handler.on_generate_node(action, &successor);
            }

            if successor.metric < space.node(successor.state).g_value {
                let is_goal = {
                    let state = generator.state(successor.state);
                    let state = state.borrow();
                    let context = task.state_context(&state, successor.auxiliary);
                    is_applicable(&task.ctx, goal, &context)
                };

                let entry = space.node_mut(successor.state);
                entry.g_value = successor.metric;
                entry.auxiliary = successor.auxiliary;
                entry.parent_state = state_index;
                entry.parent_action = action;
                entry.status = if is_goal {
                    SearchNodeStatus::Goal
                } else {
                    SearchNodeStatus::Open
                };

                let h = evaluate(heuristic, task, generator, &successor);
                if h.is_infinite() {
                    space.node_mut(successor.state).status = SearchNodeStatus::DeadEnd;
                    event_handler.on_dead_end(&successor);
                    continue;
                }

                let status = space.node(successor.state).status;
                open.push((TotalF64(successor.metric + h), status), successor.state);
            } else {
                event_handler.on_prune_node(&successor);
            }
        }
    }

    event_handler.on_end_search();
    event_handler.on_exhausted();
    SearchResult::terminal(SearchStatus::Exhausted)
}

pub(crate) fn evaluate<H: Heuristic>(
    heuristic: &mut H,
    task: &LiftedTask,
    generator: &SuccessorGenerator,
    node: &Node,
) -> f64 {
    let state = generator.state(node.state);
    let state = state.borrow();
    f64::from(heuristic.evaluate(task, &state, node.auxiliary))
}

pub(crate) fn extract_plan(space: &SearchSpace, start: Node, goal_state: StateIndex) -> Plan {
    let mut steps = Vec::new();
    let mut current = goal_state;
    while current != start.state {
        let node = space.node(current);
        steps.push(PlanStep {
            action: node.parent_action,
            state: current,
            metric: node.g_value,
        });
        current = node.parent_state;
    }
    steps.reverse();
    Plan {
        initial: start.state,
        initial_metric: start.metric,
        steps,
    }
}
