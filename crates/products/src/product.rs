use estoque_core::ProductCode;

/// A stocked product.
///
/// `code` is fixed at construction; every other field is freely writable and
/// unvalidated (negative quantities are accepted as-is).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    code: ProductCode,
    pub name: String,
    pub brand: String,
    pub stock_ceara: i64,
    pub stock_santa_catarina: i64,
    pub stock_sao_paulo: i64,
    /// Caller-supplied aggregate; never derived from the regional counters.
    pub total: i64,
    pub reserved: i64,
}

impl Product {
    /// A product with empty text fields and zeroed quantities.
    pub fn new(code: ProductCode) -> Self {
        Self {
            code,
            name: String::new(),
            brand: String::new(),
            stock_ceara: 0,
            stock_santa_catarina: 0,
            stock_sao_paulo: 0,
            total: 0,
            reserved: 0,
        }
    }

    pub fn code(&self) -> ProductCode {
        self.code
    }

    /// Overwrite only the fields present in `changes`.
    pub fn apply_changes(&mut self, changes: &ProductChanges) {
        if let Some(name) = &changes.name {
            self.name = name.clone();
        }
        if let Some(brand) = &changes.brand {
            self.brand = brand.clone();
        }
        if let Some(v) = changes.stock_ceara {
            self.stock_ceara = v;
        }
        if let Some(v) = changes.stock_santa_catarina {
            self.stock_santa_catarina = v;
        }
        if let Some(v) = changes.stock_sao_paulo {
            self.stock_sao_paulo = v;
        }
        if let Some(v) = changes.total {
            self.total = v;
        }
        if let Some(v) = changes.reserved {
            self.reserved = v;
        }
    }

    /// Replace every non-code field with the values of `other`.
    pub fn overwrite_from(&mut self, other: &Product) {
        self.name = other.name.clone();
        self.brand = other.brand.clone();
        self.stock_ceara = other.stock_ceara;
        self.stock_santa_catarina = other.stock_santa_catarina;
        self.stock_sao_paulo = other.stock_sao_paulo;
        self.total = other.total;
        self.reserved = other.reserved;
    }
}

/// Partial update: `None` means "keep the stored value".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub brand: Option<String>,
    pub stock_ceara: Option<i64>,
    pub stock_santa_catarina: Option<i64>,
    pub stock_sao_paulo: Option<i64>,
    pub total: Option<i64>,
    pub reserved: Option<i64>,
}

/// Input for creating a product: a code plus whichever fields were supplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub code: ProductCode,
    pub fields: ProductChanges,
}

impl NewProduct {
    pub fn new(code: ProductCode) -> Self {
        Self {
            code,
            fields: ProductChanges::default(),
        }
    }

    /// Build the product, defaulting every field that was not supplied.
    pub fn into_product(self) -> Product {
        let mut product = Product::new(self.code);
        product.apply_changes(&self.fields);
        product
    }
}
