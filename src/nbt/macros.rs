/// Shorthand way to create a Tag::Compound.
/// Example:
/// ```rs
/// compound!{
///     ("xPos", 0i32),
///     (String::from("Status"), "full"),
///     ("Sections", Tag::List(ListTag::Empty))
/// }
/// ```
#[macro_export]
macro_rules! compound {
	($(($name:expr, $value:expr)),+$(,)?) => {
		$crate::nbt::Tag::Compound($crate::nbt::Map::from([
			$(
				(::std::string::String::from($name), $crate::nbt::Tag::from($value)),
			)+
		]))
	};
	() => {
		$crate::nbt::Tag::Compound($crate::nbt::Map::new())
	};
}

/// Shorthand way to create a Tag::List.
/// Example:
/// ```rs
/// list![1i64, 2, 3];
/// list!["minecraft:stone", "minecraft:dirt"];
/// list![0i8; 16];
/// ```
#[macro_export]
macro_rules! list {
	($($item:expr),+$(,)?) => {
		$crate::nbt::Tag::List($crate::nbt::ListTag::from(::std::vec![
			$(
				$item,
			)+
		]))
	};
	($value:expr; $repititions:expr) => {
		$crate::nbt::Tag::List($crate::nbt::ListTag::from(::std::vec![$value; $repititions]))
	};
	() => {
		$crate::nbt::Tag::List($crate::nbt::ListTag::Empty)
	};
}
