use dynval_testhelpers::CountingAlloc;

#[global_allocator]
static ALLOC: CountingAlloc = CountingAlloc;

mod failure;
mod invariants;
mod ownership;
mod scenarios;
