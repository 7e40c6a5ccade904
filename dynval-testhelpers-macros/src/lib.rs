use unsynn::*;

keyword! {
    KFn = "fn";
}

unsynn! {
    /// Attributes, visibility and qualifiers ahead of `fn`.
    struct Prefix {
        tokens: Any<Cons<Except<KFn>, TokenTree>>,
    }

    /// Generics, parameters and return type, up to the body.
    struct Signature {
        tokens: Any<Cons<Except<BraceGroup>, TokenTree>>,
    }

    struct TestFn {
        prefix: Prefix,
        _fn: KFn,
        name: Ident,
        signature: Signature,
        body: BraceGroup,
    }
}

impl quote::ToTokens for Prefix {
    fn to_tokens(&self, tokens: &mut unsynn::TokenStream) {
        self.tokens.to_tokens(tokens)
    }
}

impl quote::ToTokens for Signature {
    fn to_tokens(&self, tokens: &mut unsynn::TokenStream) {
        self.tokens.to_tokens(tokens)
    }
}

/// How the generated function is registered and run.
enum Mode {
    /// Plain `#[test]`
    Plain,
    /// `#[test]`, with the body under `assert_no_leaks`
    LeakCheck,
    /// A caller-supplied test attribute such as `some_runtime::test`
    Custom(TokenStream),
}

impl Mode {
    fn from_attr(attr: TokenStream) -> Self {
        if attr.is_empty() {
            Mode::Plain
        } else if attr.to_string() == "leak_check" {
            Mode::LeakCheck
        } else {
            Mode::Custom(attr)
        }
    }
}

/// Marks a test that starts with `dynval_testhelpers::setup()`.
///
/// ```ignore
/// use dynval_testhelpers::test;
///
/// #[test]
/// fn logs_resizes() { /* ... */ }
///
/// #[test(leak_check)]
/// fn frees_the_whole_tree() { /* ... */ }
/// ```
///
/// `leak_check` fails the test if the body leaves allocations behind on its
/// thread; the test binary must install `CountingAlloc` as its global
/// allocator. Any other argument replaces `#[test]`, e.g.
/// `#[dynval_testhelpers::test(some_runtime::test)]`.
#[proc_macro_attribute]
pub fn test(
    attr: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    let item = TokenStream::from(item);
    let TestFn {
        prefix,
        _fn,
        name,
        signature,
        body,
    } = item.to_token_iter().parse::<TestFn>().unwrap();
    let statements = body.0.stream();

    let mode = Mode::from_attr(TokenStream::from(attr));
    let harness = match &mode {
        Mode::Plain | Mode::LeakCheck => quote::quote! { #[::core::prelude::rust_2024::test] },
        Mode::Custom(path) => quote::quote! { #[#path] },
    };
    let run = match mode {
        Mode::LeakCheck => quote::quote! {
            ::dynval_testhelpers::assert_no_leaks(|| { #statements })
        },
        Mode::Plain | Mode::Custom(_) => statements,
    };

    quote::quote! {
        #harness
        #prefix fn #name #signature {
            ::dynval_testhelpers::setup();
            #run
        }
    }
    .into()
}
