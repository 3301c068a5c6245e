//! Nested symbol tables.
//!
//! Each lexical block, function body, and module owns one [`Scope`]: a hash
//! table of singly-linked slot chains keyed on the MurmurHash3 of the symbol
//! name. Resolution walks the parent chain from inner to outer; the chain is
//! acyclic by construction. Scopes live in the [`Ast`](crate::ast::Ast)'s
//! scope arena and exclusively own their symbols.

use crate::{
    arena::{Arena, Id},
    error::ErrorKind,
    intern::NameId,
    value::{Value, ValueType},
};

pub type ScopeId = Id<Scope>;

/// Symbol flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SymbolFlags(u32);

impl SymbolFlags {
    pub const INITIALIZED: Self = Self(1 << 0);
    pub const CONST: Self = Self(1 << 1);
    pub const CONST_EVAL: Self = Self(1 << 2);
    pub const USED: Self = Self(1 << 3);
    pub const USED_MORE_THAN_ONCE: Self = Self(1 << 4);

    #[must_use]
    pub fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub fn contains(self, flag: Self) -> bool {
        self.0 & flag.0 != 0
    }

    pub fn insert(&mut self, flag: Self) {
        self.0 |= flag.0;
    }
}

/// A declared name. Symbols never move between scopes.
#[derive(Debug)]
pub struct Symbol {
    pub name: NameId,
    pub hash: u32,
    /// Declared type of the symbol.
    pub ty: ValueType,
    /// Constant-evaluated value, present once `CONST_EVAL` is set.
    pub value: Option<Value>,
    pub flags: SymbolFlags,
    /// Next symbol in this slot's chain (index into the scope's symbol
    /// storage).
    next: Option<u32>,
}

const INITIAL_CAPACITY: usize = 4;

/// One lexical scope: slot chains over this scope's own symbols.
#[derive(Debug)]
pub struct Scope {
    parent: Option<ScopeId>,
    slots: Vec<Option<u32>>,
    symbols: Vec<Symbol>,
    /// Count of chained (live) symbols. Pruned symbols stay allocated but
    /// are unlinked from every slot chain, so resolution cannot see them.
    size: usize,
    depth: u8,
}

impl Scope {
    fn new(parent: Option<ScopeId>, depth: u8) -> Self {
        Self {
            parent,
            slots: vec![None; INITIAL_CAPACITY],
            symbols: Vec::new(),
            size: 0,
            depth,
        }
    }

    #[must_use]
    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    #[must_use]
    pub fn is_module(&self) -> bool {
        self.parent.is_none()
    }

    /// Number of live symbols in this scope only.
    #[must_use]
    pub fn len(&self) -> usize {
        self.size
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// 0 at module scope, one deeper per nested block/function.
    #[must_use]
    pub fn depth(&self) -> u8 {
        self.depth
    }

    fn slot_index(&self, hash: u32) -> usize {
        hash as usize % self.slots.len()
    }

    fn find_local(&self, name: NameId, hash: u32) -> Option<usize> {
        let mut cursor = self.slots[self.slot_index(hash)];
        while let Some(index) = cursor {
            let sym = &self.symbols[index as usize];
            if sym.hash == hash && sym.name == name {
                return Some(index as usize);
            }
            cursor = sym.next;
        }
        None
    }

    fn rehash(&mut self, new_capacity: usize) {
        let mut slots = vec![None; new_capacity];
        // Walk the old chains and prepend every live symbol into its new
        // slot; unlinked symbols stay out.
        let live: Vec<u32> = self
            .slots
            .iter()
            .flat_map(|&head| {
                let mut chain = Vec::new();
                let mut cursor = head;
                while let Some(index) = cursor {
                    chain.push(index);
                    cursor = self.symbols[index as usize].next;
                }
                chain
            })
            .collect();
        for index in live {
            let slot = self.symbols[index as usize].hash as usize % new_capacity;
            self.symbols[index as usize].next = slots[slot];
            slots[slot] = Some(index);
        }
        self.slots = slots;
    }

    fn declare(
        &mut self,
        name: NameId,
        hash: u32,
        ty: ValueType,
        flags: SymbolFlags,
    ) -> Result<(), ErrorKind> {
        if self.find_local(name, hash).is_some() {
            return Err(ErrorKind::SymbolAlreadyDefined);
        }

        if self.size >= self.slots.len() * 3 / 4 {
            self.rehash(self.slots.len() * 2);
        }

        let index = u32::try_from(self.symbols.len()).expect("scope exceeds u32 symbols");
        let slot = self.slot_index(hash);
        self.symbols.push(Symbol {
            name,
            hash,
            ty,
            value: None,
            flags,
            next: self.slots[slot],
        });
        self.slots[slot] = Some(index);
        self.size += 1;
        Ok(())
    }

    /// Drops symbols in this scope (only) whose USED flag is clear.
    fn remove_unused(&mut self) {
        for slot in 0..self.slots.len() {
            let mut cursor = self.slots[slot];
            let mut prev: Option<u32> = None;
            while let Some(index) = cursor {
                let next = self.symbols[index as usize].next;
                if self.symbols[index as usize]
                    .flags
                    .contains(SymbolFlags::USED)
                {
                    prev = Some(index);
                } else {
                    match prev {
                        Some(p) => self.symbols[p as usize].next = next,
                        None => self.slots[slot] = next,
                    }
                    self.symbols[index as usize].next = None;
                    self.size -= 1;
                }
                cursor = next;
            }
        }
    }
}

/// The scope tree of one compilation.
///
/// Operations that resolve a name take the scope to start from and walk
/// parent links; mutation always lands on the scope that actually declares
/// the symbol.
#[derive(Debug)]
pub struct Scopes {
    arena: Arena<Scope>,
}

impl Default for Scopes {
    fn default() -> Self {
        Self {
            arena: Arena::new(),
        }
    }
}

impl Scopes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, parent: Option<ScopeId>) -> ScopeId {
        let depth = parent.map_or(0, |p| self.arena[p].depth + 1);
        self.arena.alloc(Scope::new(parent, depth))
    }

    #[must_use]
    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.arena[id]
    }

    /// Declares a name in `scope` itself. Fails if `scope` already has it.
    pub fn declare(
        &mut self,
        scope: ScopeId,
        name: NameId,
        hash: u32,
        ty: ValueType,
        flags: SymbolFlags,
    ) -> Result<(), ErrorKind> {
        self.arena[scope].declare(name, hash, ty, flags)
    }

    /// Walks from `scope` upward and returns the first match.
    #[must_use]
    pub fn resolve(&self, scope: ScopeId, name: NameId, hash: u32) -> Option<(ScopeId, usize)> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(index) = self.arena[id].find_local(name, hash) {
                return Some((id, index));
            }
            current = self.arena[id].parent;
        }
        None
    }

    #[must_use]
    pub fn symbol(&self, scope: ScopeId, index: usize) -> &Symbol {
        &self.arena[scope].symbols[index]
    }

    /// Resolves and sets USED; a second call sets USED_MORE_THAN_ONCE.
    pub fn mark_used(&mut self, scope: ScopeId, name: NameId, hash: u32) {
        if let Some((owner, index)) = self.resolve(scope, name, hash) {
            let flags = &mut self.arena[owner].symbols[index].flags;
            if flags.contains(SymbolFlags::USED) {
                flags.insert(SymbolFlags::USED_MORE_THAN_ONCE);
            } else {
                flags.insert(SymbolFlags::USED);
            }
        }
    }

    /// Resolves and sets INITIALIZED.
    pub fn mark_initialized(&mut self, scope: ScopeId, name: NameId, hash: u32) {
        if let Some((owner, index)) = self.resolve(scope, name, hash) {
            self.arena[owner].symbols[index]
                .flags
                .insert(SymbolFlags::INITIALIZED);
        }
    }

    /// Overwrites the symbol's constant-evaluated value. The value's type
    /// must match the symbol's declared type.
    pub fn assign_constant_evaluated(
        &mut self,
        scope: ScopeId,
        name: NameId,
        hash: u32,
        value: Value,
    ) -> Result<(), ErrorKind> {
        let Some((owner, index)) = self.resolve(scope, name, hash) else {
            return Err(ErrorKind::SymbolNotDefined);
        };
        let symbol = &mut self.arena[owner].symbols[index];
        if symbol.ty != value.value_type() {
            return Err(ErrorKind::TypeIsIncompatible);
        }
        symbol.value = Some(value);
        symbol.flags.insert(SymbolFlags::INITIALIZED);
        symbol.flags.insert(SymbolFlags::CONST_EVAL);
        Ok(())
    }

    /// Prunes unused symbols from `scope` itself.
    pub fn remove_unused(&mut self, scope: ScopeId) {
        self.arena[scope].remove_unused();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intern::Interner;

    fn setup() -> (Scopes, Interner) {
        (Scopes::new(), Interner::new())
    }

    fn name(interner: &mut Interner, text: &str) -> (NameId, u32) {
        let id = interner.intern_name(text);
        (id, interner.name_hash(id))
    }

    #[test]
    fn declare_twice_in_same_scope_fails() {
        let (mut scopes, mut interner) = setup();
        let root = scopes.allocate(None);
        let (x, h) = name(&mut interner, "x");
        scopes
            .declare(root, x, h, ValueType::I64, SymbolFlags::empty())
            .unwrap();
        assert_eq!(
            scopes.declare(root, x, h, ValueType::I64, SymbolFlags::empty()),
            Err(ErrorKind::SymbolAlreadyDefined)
        );
    }

    #[test]
    fn shadowing_in_a_child_scope_is_allowed() {
        let (mut scopes, mut interner) = setup();
        let root = scopes.allocate(None);
        let inner = scopes.allocate(Some(root));
        let (x, h) = name(&mut interner, "x");
        scopes
            .declare(root, x, h, ValueType::I64, SymbolFlags::empty())
            .unwrap();
        scopes
            .declare(inner, x, h, ValueType::F64, SymbolFlags::empty())
            .unwrap();

        let (owner, index) = scopes.resolve(inner, x, h).unwrap();
        assert_eq!(owner, inner);
        assert_eq!(scopes.symbol(owner, index).ty, ValueType::F64);

        let (owner, index) = scopes.resolve(root, x, h).unwrap();
        assert_eq!(owner, root);
        assert_eq!(scopes.symbol(owner, index).ty, ValueType::I64);
    }

    #[test]
    fn resolution_walks_the_parent_chain() {
        let (mut scopes, mut interner) = setup();
        let root = scopes.allocate(None);
        let mid = scopes.allocate(Some(root));
        let leaf = scopes.allocate(Some(mid));
        assert_eq!(scopes.get(leaf).depth(), 2);

        let (y, h) = name(&mut interner, "y");
        scopes
            .declare(root, y, h, ValueType::Str, SymbolFlags::empty())
            .unwrap();
        let (owner, _) = scopes.resolve(leaf, y, h).unwrap();
        assert_eq!(owner, root);
    }

    #[test]
    fn mark_used_escalates_to_used_more_than_once() {
        let (mut scopes, mut interner) = setup();
        let root = scopes.allocate(None);
        let (x, h) = name(&mut interner, "x");
        scopes
            .declare(root, x, h, ValueType::I64, SymbolFlags::empty())
            .unwrap();

        scopes.mark_used(root, x, h);
        let (owner, index) = scopes.resolve(root, x, h).unwrap();
        let flags = scopes.symbol(owner, index).flags;
        assert!(flags.contains(SymbolFlags::USED));
        assert!(!flags.contains(SymbolFlags::USED_MORE_THAN_ONCE));

        scopes.mark_used(root, x, h);
        let flags = scopes.symbol(owner, index).flags;
        assert!(flags.contains(SymbolFlags::USED_MORE_THAN_ONCE));
    }

    #[test]
    fn remove_unused_drops_only_unused_symbols_in_this_scope() {
        let (mut scopes, mut interner) = setup();
        let root = scopes.allocate(None);
        let inner = scopes.allocate(Some(root));
        let (kept, hk) = name(&mut interner, "kept");
        let (dropped, hd) = name(&mut interner, "dropped");
        let (outer, ho) = name(&mut interner, "outer");

        scopes
            .declare(inner, kept, hk, ValueType::I64, SymbolFlags::empty())
            .unwrap();
        scopes
            .declare(inner, dropped, hd, ValueType::I64, SymbolFlags::empty())
            .unwrap();
        scopes
            .declare(root, outer, ho, ValueType::I64, SymbolFlags::empty())
            .unwrap();
        scopes.mark_used(inner, kept, hk);

        scopes.remove_unused(inner);
        assert!(scopes.resolve(inner, kept, hk).is_some());
        assert!(scopes.resolve(inner, dropped, hd).is_none());
        // The parent scope is untouched even though `outer` is unused.
        assert!(scopes.resolve(root, outer, ho).is_some());
        assert_eq!(scopes.get(inner).len(), 1);
    }

    #[test]
    fn rehash_preserves_all_symbols_past_the_load_factor() {
        let (mut scopes, mut interner) = setup();
        let root = scopes.allocate(None);
        let names: Vec<_> = (0..32)
            .map(|i| name(&mut interner, &format!("sym{i}")))
            .collect();
        for &(id, h) in &names {
            scopes
                .declare(root, id, h, ValueType::I64, SymbolFlags::empty())
                .unwrap();
        }
        assert_eq!(scopes.get(root).len(), 32);
        for &(id, h) in &names {
            assert!(scopes.resolve(root, id, h).is_some());
        }
    }

    #[test]
    fn constant_evaluation_requires_matching_type() {
        let (mut scopes, mut interner) = setup();
        let root = scopes.allocate(None);
        let (x, h) = name(&mut interner, "x");
        scopes
            .declare(root, x, h, ValueType::I64, SymbolFlags::empty())
            .unwrap();

        assert_eq!(
            scopes.assign_constant_evaluated(root, x, h, Value::F64(1.0)),
            Err(ErrorKind::TypeIsIncompatible)
        );
        scopes
            .assign_constant_evaluated(root, x, h, Value::I64(7))
            .unwrap();
        let (owner, index) = scopes.resolve(root, x, h).unwrap();
        let symbol = scopes.symbol(owner, index);
        assert_eq!(symbol.value, Some(Value::I64(7)));
        assert!(symbol.flags.contains(SymbolFlags::CONST_EVAL));
        assert!(symbol.flags.contains(SymbolFlags::INITIALIZED));
    }
}
