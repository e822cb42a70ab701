use crate::heuristics::Heuristic;
use crate::metric::{is_applicable, is_statically_applicable};
use crate::plan::Plan;
use crate::search::astar::{evaluate, extract_plan};
use crate::search::event::EventHandler;
use crate::search::{
    CountdownWatch, OpenList, SearchNodeStatus, SearchOptions, SearchResult, SearchSpace,
    SearchStatus, TotalF64,
};
use crate::successor::{Node, SuccessorGenerator};
use crate::task::LiftedTask;
use tracing::debug;

/// Greedy best-first search: best-first on `h`, with `g` and then insertion
/// order as tie-breaks. Faster to a goal than A★ on most tasks, with no
/// optimality guarantee.
pub fn gbfs<H: Heuristic, E: EventHandler>(
    task: &mut LiftedTask,
    generator: &mut SuccessorGenerator,
    heuristic: &mut H,
    event_handler: &mut E,
    options: &SearchOptions,
) -> SearchResult {
    let goal = task.task_data.goal;

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
    {
        let entry = space.node_mut(start.state);
        entry.g_value = start.metric;
        entry.auxiliary = start.auxiliary;
        entry.status = if start_h.is_infinite() {
            SearchNodeStatus::DeadEnd
        } else {
            SearchNodeStatus::Open
        };
    }

    if space.node(start.state).status == SearchNodeStatus::DeadEnd {
        event_handler.on_unsolvable();
        return SearchResult::terminal(SearchStatus::Unsolvable);
    }

    event_handler.on_start_search(&start, start_h);

    let mut open: OpenList<(TotalF64, TotalF64)> = OpenList::new();
    open.push((TotalF64(start_h), TotalF64(start.metric)), start.state);
    let mut best_h = start_h;

    let watch = options.max_time.map(CountdownWatch::new);
    let mut successors = Vec::new();

    while let Some(((TotalF64(h), _), state_index)) = open.pop() {
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

        if h < best_h {
            best_h = h;
            debug!(h = best_h, expanded = space.len(), "improved heuristic value");
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
            let is_new = space.node_mut(successor.state).status == SearchNodeStatus::New;

            if is_new && generator.repository.len() > options.max_num_states {
                debug!(states = generator.repository.len(), "state budget exceeded");
                return SearchResult::terminal(SearchStatus::OutOfStates);
            }

            if !is_new {
                event_handler.on_prune_node(&successor);
                continue;
            }

            event_handler.on_generate_node(action, &successor);

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

            open.push((TotalF64(h), TotalF64(successor.metric)), successor.state);
        }
    }

    event_handler.on_end_search();
    event_handler.on_exhausted();
    SearchResult::terminal(SearchStatus::Exhausted)
}
