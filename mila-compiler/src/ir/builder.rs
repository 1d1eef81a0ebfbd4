//! Instruction builder with a movable insertion point.

use thiserror::Error;

use super::ir::*;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuilderError {
    #[error("builder is not positioned at a block")]
    Unpositioned,

    #[error("block '{0}' already has a terminator")]
    AlreadyTerminated(String),
}

/// Builds one function. The insertion point is the block new instructions are
/// appended to; it moves only through [`Builder::position_at_end`].
pub struct Builder {
    function: Function,
    current: Option<BlockId>,
}

impl Builder {
    pub fn new(function: Function) -> Self {
        Self {
            function,
            current: None,
        }
    }

    pub fn function(&self) -> &Function {
        &self.function
    }

    pub fn finish(self) -> Function {
        self.function
    }

    /// Create a detached block; attach it later with [`Builder::attach_block`].
    pub fn create_block(&mut self, label: &str) -> BlockId {
        self.function.create_block(label)
    }

    /// Create a block and attach it at the end of the layout.
    pub fn append_block(&mut self, label: &str) -> BlockId {
        self.function.append_block(label)
    }

    pub fn attach_block(&mut self, id: BlockId) {
        self.function.attach_block(id);
    }

    pub fn position_at_end(&mut self, id: BlockId) {
        self.current = Some(id);
    }

    pub fn value_type(&self, value: &Value) -> Type {
        self.function.value_type(value)
    }

    fn open_block(&self) -> Result<BlockId, BuilderError> {
        let id = self.current.ok_or(BuilderError::Unpositioned)?;
        let block = self.function.block(id);
        if block.terminator.is_some() {
            return Err(BuilderError::AlreadyTerminated(block.label.clone()));
        }
        Ok(id)
    }

    fn push(&mut self, kind: InstKind, ty: Type, name: &str) -> Result<Value, BuilderError> {
        let block = self.open_block()?;
        let name = (ty != Type::Void).then(|| self.function.unique_name(name));
        self.function.insts.push(Inst { name, ty, kind });
        let id = InstId(self.function.insts.len() - 1);
        self.function.block_mut(block).insts.push(id);
        Ok(Value::Inst(id))
    }

    fn terminate(&mut self, terminator: Terminator) -> Result<(), BuilderError> {
        let block = self.open_block()?;
        self.function.block_mut(block).terminator = Some(terminator);
        Ok(())
    }

    pub fn build_load(&mut self, ptr: Value, name: &str) -> Result<Value, BuilderError> {
        self.push(InstKind::Load { ptr }, Type::I32, name)
    }

    pub fn build_store(&mut self, value: Value, ptr: Value) -> Result<(), BuilderError> {
        self.push(InstKind::Store { value, ptr }, Type::Void, "")?;
        Ok(())
    }

    /// Binary arithmetic or bitwise op; the result has the type of `lhs`.
    pub fn build_binary(
        &mut self,
        op: BinaryOp,
        lhs: Value,
        rhs: Value,
        name: &str,
    ) -> Result<Value, BuilderError> {
        let ty = self.value_type(&lhs);
        self.push(InstKind::Binary { op, lhs, rhs }, ty, name)
    }

    /// `sub i32 0, operand`
    pub fn build_neg(&mut self, operand: Value, name: &str) -> Result<Value, BuilderError> {
        self.build_binary(BinaryOp::Sub, Value::ConstInt(0), operand, name)
    }

    pub fn build_icmp(
        &mut self,
        pred: IntPredicate,
        lhs: Value,
        rhs: Value,
        name: &str,
    ) -> Result<Value, BuilderError> {
        self.push(InstKind::ICmp { pred, lhs, rhs }, Type::I1, name)
    }

    pub fn build_zext(&mut self, value: Value, name: &str) -> Result<Value, BuilderError> {
        self.push(InstKind::ZExt { value }, Type::I32, name)
    }

    pub fn build_element_ptr(
        &mut self,
        base: Value,
        len: usize,
        index: Value,
        name: &str,
    ) -> Result<Value, BuilderError> {
        self.push(InstKind::ElementPtr { base, len, index }, Type::Ptr, name)
    }

    pub fn build_call(
        &mut self,
        callee: DeclId,
        ret: Type,
        args: Vec<Value>,
        name: &str,
    ) -> Result<Value, BuilderError> {
        self.push(InstKind::Call { callee, args }, ret, name)
    }

    pub fn build_br(&mut self, dest: BlockId) -> Result<(), BuilderError> {
        self.terminate(Terminator::Br(dest))
    }

    pub fn build_cond_br(
        &mut self,
        cond: Value,
        then_dest: BlockId,
        else_dest: BlockId,
    ) -> Result<(), BuilderError> {
        self.terminate(Terminator::CondBr {
            cond,
            then_dest,
            else_dest,
        })
    }

    pub fn build_return(&mut self, value: Option<Value>) -> Result<(), BuilderError> {
        self.terminate(Terminator::Ret(value))
    }
}
