//! Integration tests for loop metadata construction.
//!
//! These drive the loop stack and the chain builder through the public API
//! and check the shape of the resulting `llvm.loop` chains.

use bumpalo::Bump;
use hashbrown::HashSet;
use loopmd::core::{CodeGenOptions, Metadata, MetadataContext, NodeId, SourceLoc};
use loopmd::hints::{Directive, HintOption, HintState, LoopAttributes, LoopHint, TransformState};
use loopmd::loops::chain::*;
use loopmd::loops::{ChainBuilder, LoopInfoStack};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Distinct nodes reachable from `root`.
fn reachable_distinct(ctx: &MetadataContext<'_>, root: NodeId) -> HashSet<NodeId> {
    let mut seen = HashSet::new();
    let mut worklist = vec![ctx.resolve(root)];
    while let Some(id) = worklist.pop() {
        let id = ctx.resolve(id);
        if ctx.is_distinct(id) && !seen.insert(id) {
            continue;
        }
        for op in ctx.operands(id) {
            if let Some(child) = op.as_node() {
                let child = ctx.resolve(child);
                if child != id && !seen.contains(&child) {
                    worklist.push(child);
                }
            }
        }
    }
    seen
}

fn followup_of(ctx: &MetadataContext<'_>, node: NodeId, tag: &str) -> Option<NodeId> {
    ctx.find_property(node, tag)?.first()?.as_node()
}

/// Every node reachable through a followup link carries the guard of the
/// stage that owns the link.
fn assert_guards(ctx: &MetadataContext<'_>, node: NodeId, required: &mut Vec<(&'static str, Option<bool>)>) {
    for &(tag, value) in required.iter() {
        let found = ctx.find_property(node, tag);
        assert!(found.is_some(), "node {node} is missing guard {tag}");
        if let Some(value) = value {
            assert_eq!(found.unwrap()[0].as_bool(), Some(value), "guard {tag} on {node}");
        }
    }

    let links: [(&str, (&'static str, Option<bool>)); 4] = [
        (DISTRIBUTE_FOLLOWUP_ALL, (DISTRIBUTE_ENABLE, Some(false))),
        (VECTORIZE_FOLLOWUP_ALL, (IS_VECTORIZED, None)),
        (UNROLL_AND_JAM_FOLLOWUP_OUTER, (UNROLL_AND_JAM_DISABLE, None)),
        (UNROLL_FOLLOWUP_ALL, (UNROLL_DISABLE, None)),
    ];
    for (link, guard) in links {
        if let Some(followup) = followup_of(ctx, node, link) {
            required.push(guard);
            assert_guards(ctx, followup, required);
            required.pop();
        }
    }
}

fn everything_enabled() -> LoopAttributes {
    LoopAttributes {
        distribute_enable: TransformState::Enable,
        vectorize_width: 4,
        interleave_count: 2,
        unroll_and_jam_count: 2,
        unroll_count: 4,
        pipeline_initiation_interval: 3,
        ..LoopAttributes::default()
    }
}

#[test]
fn test_identity_uniqueness_across_loops() {
    init();
    let arena = Bump::new();
    let mut ctx = MetadataContext::new(&arena);
    let mut stack = LoopInfoStack::new(&mut ctx);

    *stack.staged_attributes_mut() = everything_enabled();
    stack.push(0u32, None, None);
    let first = stack.pop().unwrap();

    *stack.staged_attributes_mut() = everything_enabled();
    stack.push(1u32, None, None);
    let second = stack.pop().unwrap();

    assert_ne!(first, second);
    let first_nodes = reachable_distinct(&ctx, first);
    let second_nodes = reachable_distinct(&ctx, second);
    assert!(first_nodes.len() > 1);
    assert!(first_nodes.is_disjoint(&second_nodes));
}

#[test]
fn test_repeated_builds_never_alias() {
    let arena = Bump::new();
    let mut ctx = MetadataContext::new(&arena);
    let attrs = everything_enabled();

    let first = ChainBuilder::new(&mut ctx).build(&attrs, &[]);
    let second = ChainBuilder::new(&mut ctx).build(&attrs, &[]);
    assert_ne!(first.id, second.id);
    assert!(ctx.is_self_referencing(first.id));
    assert!(ctx.is_self_referencing(second.id));
}

#[test]
fn test_followups_carry_stage_guards() {
    init();
    let arena = Bump::new();
    let mut ctx = MetadataContext::new(&arena);
    let chain = ChainBuilder::new(&mut ctx).build(&everything_enabled(), &[]);
    assert!(chain.has_user_transforms);

    // distribute -> vectorize -> unroll-and-jam -> unroll -> pipeline
    let vectorize = followup_of(&ctx, chain.id, DISTRIBUTE_FOLLOWUP_ALL).unwrap();
    let jam = followup_of(&ctx, vectorize, VECTORIZE_FOLLOWUP_ALL).unwrap();
    let unroll = followup_of(&ctx, jam, UNROLL_AND_JAM_FOLLOWUP_OUTER).unwrap();
    let pipeline = followup_of(&ctx, unroll, UNROLL_FOLLOWUP_ALL).unwrap();
    assert!(ctx.has_property(pipeline, PIPELINE_INITIATION_INTERVAL));

    assert_guards(&ctx, chain.id, &mut Vec::new());
}

#[test]
fn test_full_unroll_takes_precedence() {
    let arena = Bump::new();
    let mut ctx = MetadataContext::new(&arena);
    let attrs = LoopAttributes {
        unroll_enable: TransformState::Full,
        vectorize_width: 8,
        vectorize_enable: TransformState::Enable,
        ..LoopAttributes::default()
    };

    let chain = ChainBuilder::new(&mut ctx).build(&attrs, &[]);
    assert_eq!(ctx.property_tags(chain.id), vec![UNROLL_FULL]);
    assert!(!ctx.has_property(chain.id, VECTORIZE_WIDTH));
    assert_eq!(ctx.operands(chain.id).len(), 2);
}

#[test]
fn test_no_request_produces_nothing() {
    let arena = Bump::new();
    let mut ctx = MetadataContext::new(&arena);
    let mut stack = LoopInfoStack::new(&mut ctx);

    stack.push(0u32, None, None);
    assert!(stack.info().loop_id().is_none());
    assert!(stack.info().access_group().is_none());
    assert_eq!(stack.pop(), None);

    let stats = ctx.stats();
    assert_eq!(stats.placeholders_created, 0);
    assert_eq!(stats.loops_finished, 0);
    assert!(ctx.is_empty());
}

#[test]
fn test_unroll_disable_passes_through() {
    let arena = Bump::new();
    let mut ctx = MetadataContext::new(&arena);
    let mut stack = LoopInfoStack::new(&mut ctx);

    stack.staged_attributes_mut().unroll_enable = TransformState::Disable;
    stack.push(0u32, Some(SourceLoc::new(4, 2)), None);
    let loop_id = stack.pop().unwrap();

    assert_eq!(ctx.property_tags(loop_id), vec![UNROLL_DISABLE]);
    // Self reference, the start location and the marker; no nested nodes.
    assert_eq!(ctx.operands(loop_id).len(), 3);
    assert_eq!(reachable_distinct(&ctx, loop_id).len(), 1);
}

#[test]
fn test_vectorize_width_and_interleave_scenario() {
    init();
    let arena = Bump::new();
    let mut ctx = MetadataContext::new(&arena);
    let mut stack = LoopInfoStack::new(&mut ctx);

    let directives: Vec<Directive> = vec![
        LoopHint::numeric(HintOption::VectorizeWidth, &[4]).into(),
        LoopHint::numeric(HintOption::InterleaveCount, &[2]).into(),
    ];
    stack
        .push_with_hints(0u32, &CodeGenOptions::default(), &directives, None, None)
        .unwrap();

    let attrs = stack.info().attributes().clone();
    assert_eq!(attrs.vectorize_width, 4);
    assert_eq!(attrs.interleave_count, 2);
    assert_eq!(attrs.vectorize_enable, TransformState::Unspecified);

    let loop_id = stack.pop().unwrap();
    assert_eq!(
        ctx.property_tags(loop_id),
        vec![VECTORIZE_WIDTH, INTERLEAVE_COUNT, VECTORIZE_ENABLE]
    );
    assert_eq!(
        ctx.find_property(loop_id, VECTORIZE_ENABLE),
        Some(&[Metadata::i1(true)][..])
    );
    assert!(!ctx.has_property(loop_id, UNROLL_COUNT));
    assert!(!ctx.has_property(loop_id, DISTRIBUTE_ENABLE));
    assert!(!ctx.has_property(loop_id, VECTORIZE_FOLLOWUP_ALL));
}

#[test]
fn test_unroll_and_jam_parent_with_fully_unrolled_child() {
    init();
    let arena = Bump::new();
    let mut ctx = MetadataContext::new(&arena);
    let mut stack = LoopInfoStack::new(&mut ctx);

    let jam: Directive = LoopHint::numeric(HintOption::UnrollAndJamCount, &[4]).into();
    stack
        .push_with_hints(0u32, &CodeGenOptions::default(), &[jam], None, None)
        .unwrap();

    let full: Directive = LoopHint::new(HintOption::Unroll, HintState::Full).into();
    stack
        .push_with_hints(1u32, &CodeGenOptions::default(), &[full], None, None)
        .unwrap();

    let child = stack.pop().unwrap();
    // The post-jam half carries no request, so nothing is recorded.
    assert_eq!(stack.info().unroll_and_jam_inner_followup(), None);
    let parent = stack.pop().unwrap();

    assert_eq!(ctx.property_tags(child), vec![UNROLL_FULL]);
    assert_eq!(ctx.property_tags(parent), vec![UNROLL_AND_JAM_COUNT]);
    assert_eq!(ctx.stats().inner_followups, 0);
}

#[test]
fn test_unroll_and_jam_inner_followup_keeps_vectorized_marker() {
    let arena = Bump::new();
    let mut ctx = MetadataContext::new(&arena);
    let mut stack = LoopInfoStack::new(&mut ctx);

    stack.staged_attributes_mut().unroll_and_jam_enable = TransformState::Enable;
    stack.push(0u32, None, None);

    {
        let child = stack.staged_attributes_mut();
        child.vectorize_width = 4;
        child.unroll_count = 2;
    }
    stack.push(1u32, None, None);
    let child = stack.pop().unwrap();
    let followup = stack.info().unroll_and_jam_inner_followup().unwrap();
    let parent = stack.pop().unwrap();

    // Before the jam: vectorize only.
    assert!(ctx.has_property(child, VECTORIZE_WIDTH));
    assert!(!ctx.has_property(child, UNROLL_COUNT));

    // After the jam: partial unroll, guarded against re-vectorization.
    assert_eq!(ctx.property_tags(followup), vec![IS_VECTORIZED, UNROLL_COUNT]);

    assert_eq!(
        ctx.property_tags(parent),
        vec![UNROLL_AND_JAM_ENABLE, UNROLL_AND_JAM_FOLLOWUP_INNER]
    );
    assert_eq!(followup_of(&ctx, parent, UNROLL_AND_JAM_FOLLOWUP_INNER), Some(followup));
}

#[test]
fn test_global_unroll_disable() {
    let arena = Bump::new();
    let mut ctx = MetadataContext::new(&arena);
    let mut stack = LoopInfoStack::new(&mut ctx);
    let options = CodeGenOptions::new()
        .with_optimization_level(2)
        .with_unroll_loops(false);

    stack.push_with_hints(0u32, &options, &[], None, None).unwrap();
    let plain = stack.pop().unwrap();
    assert_eq!(ctx_tags(&stack, plain), vec![UNROLL_DISABLE]);

    let count: Directive = LoopHint::numeric(HintOption::UnrollCount, &[8]).into();
    stack.push_with_hints(1u32, &options, &[count], None, None).unwrap();
    let counted = stack.pop().unwrap();
    assert_eq!(ctx_tags(&stack, counted), vec![UNROLL_COUNT]);
}

fn ctx_tags(stack: &LoopInfoStack<'_, '_, u32>, id: NodeId) -> Vec<String> {
    stack
        .context()
        .property_tags(id)
        .into_iter()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_opencl_unroll_hints() {
    let arena = Bump::new();
    let mut ctx = MetadataContext::new(&arena);
    let mut stack = LoopInfoStack::new(&mut ctx);
    let options = CodeGenOptions::default();

    stack
        .push_with_hints(0u32, &options, &[Directive::OpenClUnroll(0)], None, None)
        .unwrap();
    assert_eq!(stack.info().attributes().unroll_enable, TransformState::Enable);
    let enabled = stack.pop().unwrap();
    assert_eq!(ctx_tags(&stack, enabled), vec![UNROLL_ENABLE]);

    stack
        .push_with_hints(1u32, &options, &[Directive::OpenClUnroll(8)], None, None)
        .unwrap();
    assert_eq!(stack.info().attributes().unroll_count, 8);
    assert_eq!(stack.info().attributes().unroll_enable, TransformState::Unspecified);
    stack.pop();

    stack
        .push_with_hints(2u32, &options, &[Directive::OpenClUnroll(1)], None, None)
        .unwrap();
    assert!(stack.info().attributes().is_default());
    assert_eq!(stack.pop(), None);
}
