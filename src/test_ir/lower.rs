//! TIR lowering driver.
//!
//! Walks each function's loop tree the way a code generator walks loop
//! statements: the branch into a loop is emitted before the loop is pushed,
//! every instruction is passed to the loop stack for tagging as it is
//! emitted, and the back-edge `condbr` is emitted before the loop is popped.
//! Attachments therefore hold placeholder ids that the printer resolves.

use super::{DriverOptions, LoopModule, LoopStmt, Opcode, Stmt};
use crate::core::adaptor::InstructionAdaptor;
use crate::core::context::MetadataContext;
use crate::core::metadata::{MetadataKind, NodeId};
use crate::core::printer::MetadataPrinter;
use crate::loops::stack::LoopInfoStack;
use bumpalo::Bump;
use log::debug;
use std::fmt::{self, Write};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(pub u32);

/// An emitted instruction with its attachments.
#[derive(Debug, Clone, PartialEq)]
pub struct Inst {
    pub opcode: Opcode,
    pub successors: Vec<BlockId>,
    pub loop_md: Option<NodeId>,
    pub access_group: Option<NodeId>,
}

impl Inst {
    pub fn new(opcode: Opcode, successors: Vec<BlockId>) -> Self {
        Self {
            opcode,
            successors,
            loop_md: None,
            access_group: None,
        }
    }
}

impl InstructionAdaptor for Inst {
    type BlockRef = BlockId;

    fn may_read_or_write_memory(&self) -> bool {
        self.opcode.info().touches_memory
    }

    fn is_terminator(&self) -> bool {
        self.opcode.info().is_terminator
    }

    fn successors(&self) -> Box<dyn Iterator<Item = BlockId> + '_> {
        Box::new(self.successors.iter().copied())
    }

    fn set_metadata(&mut self, kind: MetadataKind, node: Option<NodeId>) {
        match kind {
            MetadataKind::Loop => self.loop_md = node,
            MetadataKind::AccessGroup => self.access_group = node,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub name: String,
    pub insts: Vec<Inst>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoweredFunction {
    pub name: String,
    /// In layout order.
    pub blocks: Vec<Block>,
}

impl LoweredFunction {
    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.0 as usize]
    }

    /// Every instruction in layout order.
    pub fn insts(&self) -> impl Iterator<Item = &Inst> {
        self.blocks.iter().flat_map(|block| block.insts.iter())
    }
}

struct FunctionLowering<'s, 'c, 'arena> {
    stack: LoopInfoStack<'c, 'arena, BlockId>,
    options: &'s DriverOptions,
    blocks: Vec<Block>,
    current: BlockId,
}

impl<'s, 'c, 'arena> FunctionLowering<'s, 'c, 'arena> {
    fn new(ctx: &'c mut MetadataContext<'arena>, options: &'s DriverOptions) -> Self {
        Self {
            stack: LoopInfoStack::new(ctx),
            options,
            blocks: vec![Block {
                name: "entry".to_string(),
                insts: Vec::new(),
            }],
            current: BlockId(0),
        }
    }

    fn create_block(&mut self, name: String) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(Block {
            name,
            insts: Vec::new(),
        });
        id
    }

    fn emit(&mut self, opcode: Opcode, successors: Vec<BlockId>) {
        let mut inst = Inst::new(opcode, successors);
        self.stack.tag_instruction(&mut inst);
        self.blocks[self.current.0 as usize].insts.push(inst);
    }

    fn lower_body(&mut self, body: &[Stmt]) -> Result<(), String> {
        for stmt in body {
            match stmt {
                Stmt::Inst(op) => self.emit(*op, Vec::new()),
                Stmt::Loop(lp) => self.lower_loop(lp)?,
            }
        }
        Ok(())
    }

    fn lower_loop(&mut self, lp: &LoopStmt) -> Result<(), String> {
        let header = self.create_block(lp.header.clone());
        self.emit(Opcode::Br, vec![header]);
        self.current = header;

        self.stack
            .push_with_hints(
                header,
                &self.options.codegen,
                &lp.directives,
                lp.start_loc,
                lp.end_loc,
            )
            .map_err(|e| format!("fatal error in loop '{}': {e}", lp.header))?;

        self.lower_body(&lp.body)?;

        let exit = self.create_block(format!("{}.exit", lp.header));
        self.emit(Opcode::CondBr, vec![header, exit]);
        self.stack.pop();
        self.current = exit;
        Ok(())
    }

    fn finish(mut self, name: &str) -> LoweredFunction {
        self.emit(Opcode::Ret, Vec::new());
        assert!(!self.stack.has_info(), "loop left open at end of {name}");
        LoweredFunction {
            name: name.to_string(),
            blocks: self.blocks,
        }
    }
}

/// Lower every function of `module` into `ctx`.
pub fn lower_module(
    ctx: &mut MetadataContext<'_>,
    module: &LoopModule,
    options: &DriverOptions,
) -> Result<Vec<LoweredFunction>, String> {
    let mut lowered = Vec::with_capacity(module.functions.len());
    for func in &module.functions {
        debug!("lowering function {}", func.name);
        let mut lowering = FunctionLowering::new(ctx, options);
        lowering.lower_body(&func.body)?;
        lowered.push(lowering.finish(&func.name));
    }
    Ok(lowered)
}

fn print_inst(
    out: &mut String,
    func: &LoweredFunction,
    inst: &Inst,
    printer: &mut MetadataPrinter<'_, '_>,
) -> fmt::Result {
    write!(out, "  {}", inst.opcode.info().name)?;
    for (idx, succ) in inst.successors.iter().enumerate() {
        let sep = if idx == 0 { " " } else { ", " };
        write!(out, "{sep}^{}", func.block(*succ).name)?;
    }
    if let Some(group) = inst.access_group {
        write!(out, ", {} {}", MetadataKind::AccessGroup, printer.reference(group))?;
    }
    if let Some(loop_id) = inst.loop_md {
        write!(out, ", {} {}", MetadataKind::Loop, printer.reference(loop_id))?;
    }
    writeln!(out)
}

fn print_functions(
    functions: &[LoweredFunction],
    printer: &mut MetadataPrinter<'_, '_>,
) -> Result<String, fmt::Error> {
    let mut out = String::new();
    for func in functions {
        writeln!(out, "Function {}", func.name)?;
        for block in &func.blocks {
            writeln!(out, "{}:", block.name)?;
            for inst in &block.insts {
                print_inst(&mut out, func, inst, printer)?;
            }
        }
    }
    Ok(out)
}

/// Lower `module` and render the requested output.
pub fn run(module: &LoopModule, options: &DriverOptions) -> Result<String, String> {
    let arena = Bump::new();
    let mut ctx = MetadataContext::new(&arena);

    let mut output = String::new();
    if options.print_ir {
        output.push_str(&module.print());
    }

    let functions = lower_module(&mut ctx, module, options)?;

    let mut printer = MetadataPrinter::new(&ctx);
    let rendered = print_functions(&functions, &mut printer).map_err(|e| e.to_string())?;
    output.push_str(&rendered);

    if options.print_metadata {
        output.push_str(&printer.print_referenced());
    }
    if options.print_stats {
        output.push_str(&ctx.stats().to_string());
    }
    Ok(output)
}
